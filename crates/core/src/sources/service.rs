//! Source registration service

use std::sync::Arc;

use dashsync_domain::{DashSyncError, ExternalSource, Result, SourceKind, SyncedTable};
use tracing::{info, instrument};
use uuid::Uuid;

use super::descriptor::ConnectionDescriptor;
use super::ports::{ConnectorFactory, SourceRepository, SyncedTableRepository};

/// Registers sources and the tables selected for sync.
pub struct SourceService {
    sources: Arc<dyn SourceRepository>,
    tables: Arc<dyn SyncedTableRepository>,
    connectors: Arc<dyn ConnectorFactory>,
}

impl SourceService {
    pub fn new(
        sources: Arc<dyn SourceRepository>,
        tables: Arc<dyn SyncedTableRepository>,
        connectors: Arc<dyn ConnectorFactory>,
    ) -> Self {
        Self { sources, tables, connectors }
    }

    /// Register a new external source. The descriptor must parse for `kind`.
    #[instrument(skip(self, descriptor))]
    pub async fn register(
        &self,
        name: &str,
        kind: SourceKind,
        descriptor: &str,
    ) -> Result<ExternalSource> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DashSyncError::InvalidInput("source name is required".into()));
        }
        if descriptor.trim().is_empty() {
            return Err(DashSyncError::InvalidInput("connection descriptor is required".into()));
        }
        let parsed = ConnectionDescriptor::parse_for(kind, descriptor)?;

        let source = ExternalSource::new(Uuid::now_v7().to_string(), name, kind, descriptor.trim());
        self.sources.insert_source(&source).await?;

        info!(source_id = %source.id, %kind, descriptor = %parsed, "source registered");
        Ok(source)
    }

    /// Register `table_name` for sync. Re-registering returns the existing
    /// record.
    #[instrument(skip(self))]
    pub async fn register_table(&self, source_id: &str, table_name: &str) -> Result<SyncedTable> {
        let table_name = validate_table_name(table_name)?;
        self.require_source(source_id).await?;

        if let Some(existing) = self.tables.find_table(source_id, table_name).await? {
            return Ok(existing);
        }

        let table = SyncedTable::new(Uuid::now_v7().to_string(), source_id, table_name);
        self.tables.insert_table(&table).await?;

        // A concurrent registration may have won the unique key.
        let stored = self.tables.find_table(source_id, table_name).await?.unwrap_or(table);
        info!(source_id, table_name, table_id = %stored.id, "table registered");
        Ok(stored)
    }

    /// Open a connector for the source and check connectivity.
    pub async fn test_connection(&self, source_id: &str) -> Result<()> {
        let source = self.require_source(source_id).await?;
        let connector = self.connectors.connect(&source).await?;
        connector.test().await
    }

    pub async fn get(&self, source_id: &str) -> Result<Option<ExternalSource>> {
        self.sources.get_source(source_id).await
    }

    pub async fn list(&self) -> Result<Vec<ExternalSource>> {
        self.sources.list_sources().await
    }

    pub async fn list_tables(&self, source_id: &str) -> Result<Vec<SyncedTable>> {
        self.tables.list_tables(source_id).await
    }

    /// Remove a source with its tables, rows, cache, stored configuration
    /// and job history.
    #[instrument(skip(self))]
    pub async fn remove(&self, source_id: &str) -> Result<()> {
        if !self.sources.delete_source(source_id).await? {
            return Err(DashSyncError::NotFound(format!("source {source_id}")));
        }
        info!(source_id, "source removed");
        Ok(())
    }

    async fn require_source(&self, source_id: &str) -> Result<ExternalSource> {
        self.sources
            .get_source(source_id)
            .await?
            .ok_or_else(|| DashSyncError::NotFound(format!("source {source_id}")))
    }
}

fn validate_table_name(table_name: &str) -> Result<&str> {
    let trimmed = table_name.trim();
    if trimmed.is_empty() {
        return Err(DashSyncError::InvalidInput("table name is required".into()));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(DashSyncError::InvalidInput(format!(
            "table name {trimmed:?} contains control characters"
        )));
    }
    Ok(trimmed)
}
