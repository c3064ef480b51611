//! Synced rows and sync bookkeeping

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::document::Document;
use super::source::{ExternalSource, SyncedTable};
use crate::impl_domain_status_conversions;

/// A fetched row ready to be written to the row store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRow {
    pub original_id: String,
    pub document: Document,
}

/// A row as held by the row store. `source_id` and `table_name` are the
/// denormalized copies of the owning table's keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncedRow {
    pub id: i64,
    pub synced_table_id: String,
    pub source_id: String,
    pub table_name: String,
    pub original_id: String,
    pub document: Document,
    pub synced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncJobStatus {
    Running,
    Completed,
    Error,
}

impl_domain_status_conversions!(SyncJobStatus {
    Running => "running",
    Completed => "completed",
    Error => "error",
});

/// Record of one `syncTable` run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncJob {
    pub id: String,
    pub source_id: String,
    pub table_name: String,
    pub status: SyncJobStatus,
    pub rows_synced: i64,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Per-table outcome inside `syncAll`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSyncResult {
    pub table_name: String,
    pub success: bool,
    pub rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TableSyncResult {
    pub fn succeeded(table_name: impl Into<String>, rows: usize) -> Self {
        Self { table_name: table_name.into(), success: true, rows, error: None }
    }

    pub fn failed(table_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self { table_name: table_name.into(), success: false, rows: 0, error: Some(error.into()) }
    }
}

/// Totals for a `syncAll` run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub source_id: String,
    pub total_tables: usize,
    pub success_count: usize,
    pub failed_count: usize,
    pub total_rows: usize,
    pub tables: Vec<TableSyncResult>,
}

impl SyncSummary {
    pub fn from_results(source_id: impl Into<String>, tables: Vec<TableSyncResult>) -> Self {
        let success_count = tables.iter().filter(|t| t.success).count();
        Self {
            source_id: source_id.into(),
            total_tables: tables.len(),
            success_count,
            failed_count: tables.len() - success_count,
            total_rows: tables.iter().map(|t| t.rows).sum(),
            tables,
        }
    }
}

/// Source, recent jobs and tables, as reported by the status operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncStatusReport {
    pub source: ExternalSource,
    pub recent_jobs: Vec<SyncJob>,
    pub tables: Vec<SyncedTable>,
}
