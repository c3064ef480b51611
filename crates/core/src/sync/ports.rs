//! Port interfaces for the row store and sync bookkeeping

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashsync_domain::{Document, Filter, NewRow, Result, SyncJob, SyncedRow, SyncedTable};

/// Scope of a row-store read: one logical table of one source, narrowed by
/// AND-combined filters. Invalid filters are ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct RowQuery {
    pub source_id: String,
    pub table_name: String,
    pub filters: Vec<Filter>,
}

impl RowQuery {
    pub fn new(source_id: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self { source_id: source_id.into(), table_name: table_name.into(), filters: Vec::new() }
    }

    pub fn with_filters(mut self, filters: &[Filter]) -> Self {
        self.filters = filters.iter().filter(|f| f.is_valid()).cloned().collect();
        self
    }
}

/// Local store of synced rows, one JSON document per external row.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Replace every row of `table` with `rows`, written in batches of
    /// `batch_size`. Readers never observe a partially replaced table; a failed
    /// batch leaves the previous rows in place and surfaces
    /// `BatchInsert { batch_index }`.
    async fn replace_rows(
        &self,
        table: &SyncedTable,
        rows: Vec<NewRow>,
        batch_size: usize,
    ) -> Result<usize>;

    /// Documents matching the query, in insertion order
    async fn scan(&self, query: &RowQuery) -> Result<Vec<Document>>;

    async fn count(&self, query: &RowQuery) -> Result<i64>;

    /// Count rows whose `synced_at` lies in `[from, to)` (`to` open when None)
    async fn count_synced_between(
        &self,
        query: &RowQuery,
        from: DateTime<Utc>,
        to: Option<DateTime<Utc>>,
    ) -> Result<i64>;

    /// First `limit` documents of a synced table
    async fn sample(&self, synced_table_id: &str, limit: usize) -> Result<Vec<Document>>;

    /// Full rows of a synced table, in insertion order
    async fn rows(&self, synced_table_id: &str) -> Result<Vec<SyncedRow>>;
}

/// Persistence for sync job history
#[async_trait]
pub trait SyncJobRepository: Send + Sync {
    async fn insert_job(&self, job: &SyncJob) -> Result<()>;

    async fn update_job(&self, job: &SyncJob) -> Result<()>;

    /// Most recent jobs for a source, newest first
    async fn recent_jobs(&self, source_id: &str, limit: usize) -> Result<Vec<SyncJob>>;
}
