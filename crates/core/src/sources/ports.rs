//! Port interfaces for external sources and their registered tables

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashsync_domain::{Document, ExternalSource, Result, SyncStatus, SyncedTable};

/// An open connection to one external source.
#[async_trait]
pub trait SourceConnector: Send + Sync {
    /// Check that the source is reachable and the credentials are accepted
    async fn test(&self) -> Result<()>;

    /// Fetch every row of `table`. `limit` caps the number of rows when set.
    async fn fetch_all(&self, table: &str, limit: Option<usize>) -> Result<Vec<Document>>;
}

/// Builds a connector for a registered source from its descriptor.
#[async_trait]
pub trait ConnectorFactory: Send + Sync {
    async fn connect(&self, source: &ExternalSource) -> Result<Arc<dyn SourceConnector>>;
}

/// Persistence for registered sources
#[async_trait]
pub trait SourceRepository: Send + Sync {
    async fn insert_source(&self, source: &ExternalSource) -> Result<()>;

    async fn get_source(&self, id: &str) -> Result<Option<ExternalSource>>;

    async fn list_sources(&self) -> Result<Vec<ExternalSource>>;

    async fn update_sync_status(&self, id: &str, status: SyncStatus) -> Result<()>;

    /// Bump the source's last-synced timestamp
    async fn mark_synced(&self, id: &str, synced_at: DateTime<Utc>) -> Result<()>;

    /// Delete a source and everything it owns. Returns false when absent.
    async fn delete_source(&self, id: &str) -> Result<bool>;
}

/// Persistence for per-source table registrations
#[async_trait]
pub trait SyncedTableRepository: Send + Sync {
    async fn find_table(&self, source_id: &str, table_name: &str) -> Result<Option<SyncedTable>>;

    /// Insert a registration; an existing (source, table) pair is left as is.
    async fn insert_table(&self, table: &SyncedTable) -> Result<()>;

    async fn list_tables(&self, source_id: &str) -> Result<Vec<SyncedTable>>;

    /// Persist columns, row count and both sync timestamps
    async fn update_table(&self, table: &SyncedTable) -> Result<()>;
}
