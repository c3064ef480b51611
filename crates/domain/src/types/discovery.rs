//! Discovery output and generated dashboard configurations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::dashboard::DashboardConfig;
use super::document::Document;
use super::source::ColumnInfo;

/// A registered table with column metadata and a few sample rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredTable {
    pub table_name: String,
    pub row_count: i64,
    pub columns: Vec<ColumnInfo>,
    pub sample_rows: Vec<Document>,
}

/// Output of the configuration-generation collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedConfig {
    pub config: DashboardConfig,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub model: String,
}

/// Stored dashboard configuration, one per source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfigRecord {
    pub source_id: String,
    pub config: DashboardConfig,
    pub model: Option<String>,
    pub reasoning: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
