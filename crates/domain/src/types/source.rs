//! External sources and their registered tables

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::impl_domain_status_conversions;

/// Family of the external database behind a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Postgres,
    Mysql,
    Mongodb,
}

impl_domain_status_conversions!(SourceKind {
    Postgres => "postgres" | "postgresql",
    Mysql => "mysql",
    Mongodb => "mongodb" | "mongo",
});

/// Lifecycle status of a source as seen by the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Pending,
    Syncing,
    Active,
    Error,
}

impl_domain_status_conversions!(SyncStatus {
    Pending => "pending",
    Syncing => "syncing",
    Active => "active",
    Error => "error",
});

/// A registered external database connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalSource {
    pub id: String,
    pub name: String,
    /// Opaque credential string. Never logged.
    #[serde(skip_serializing, default)]
    pub descriptor: String,
    pub kind: SourceKind,
    pub sync_status: SyncStatus,
    pub sync_enabled: bool,
    pub sync_schedule: String,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ExternalSource {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: SourceKind,
        descriptor: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            descriptor: descriptor.into(),
            kind,
            sync_status: SyncStatus::Pending,
            sync_enabled: true,
            sync_schedule: "manual".to_string(),
            last_synced_at: None,
            created_at: Utc::now(),
        }
    }
}

/// Column name plus the type sampled from a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self { name: name.into(), column_type: column_type.into() }
    }
}

/// Local registration and metadata for one table of a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncedTable {
    pub id: String,
    pub source_id: String,
    pub table_name: String,
    pub columns: Vec<ColumnInfo>,
    pub row_count: i64,
    pub last_schema_synced_at: Option<DateTime<Utc>>,
    pub last_data_synced_at: Option<DateTime<Utc>>,
}

impl SyncedTable {
    pub fn new(
        id: impl Into<String>,
        source_id: impl Into<String>,
        table_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source_id: source_id.into(),
            table_name: table_name.into(),
            columns: Vec::new(),
            row_count: 0,
            last_schema_synced_at: None,
            last_data_synced_at: None,
        }
    }
}
