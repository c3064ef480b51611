//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for DashSync
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum DashSyncError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),

    /// The external source could not be reached, authenticated against, or
    /// its descriptor could not be understood.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The table has not been registered for sync on this source.
    #[error("Table '{table_name}' is not registered for source {source_id}")]
    NotRegistered { source_id: String, table_name: String },

    /// A write batch failed while replacing a table's rows. `batch_index` is
    /// 1-based.
    #[error("Failed to insert batch {batch_index}: {message}")]
    BatchInsert { batch_index: usize, message: String },

    /// A single chart or KPI could not be computed.
    #[error("Aggregation error: {0}")]
    Aggregation(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl DashSyncError {
    /// Stable label for logs and job records.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Database(_) => "database",
            Self::Config(_) => "config",
            Self::Network(_) => "network",
            Self::Auth(_) => "auth",
            Self::NotFound(_) => "not_found",
            Self::InvalidInput(_) => "invalid_input",
            Self::Internal(_) => "internal",
            Self::Connection(_) => "connection",
            Self::NotRegistered { .. } => "not_registered",
            Self::BatchInsert { .. } => "batch_insert",
            Self::Aggregation(_) => "aggregation",
            Self::Unsupported(_) => "unsupported",
        }
    }
}

/// Result type alias for DashSync operations
pub type Result<T> = std::result::Result<T, DashSyncError>;
