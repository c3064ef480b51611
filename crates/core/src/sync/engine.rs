//! Sync engine: fetch from a connector, replace-all into the row store,
//! then update table and source metadata.

use std::sync::Arc;

use chrono::Utc;
use dashsync_domain::constants::{DEFAULT_SYNC_BATCH_SIZE, RECENT_SYNC_JOBS_LIMIT};
use dashsync_domain::{
    DashSyncError, Document, ExternalSource, NewRow, Result, SyncJob, SyncJobStatus,
    SyncStatus, SyncStatusReport, SyncSummary, SyncedTable, TableSyncResult,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::ports::{RowStore, SyncJobRepository};
use crate::sources::ports::{
    ConnectorFactory, SourceConnector, SourceRepository, SyncedTableRepository,
};

/// Copies registered tables from external sources into the local row store.
pub struct SyncEngine {
    sources: Arc<dyn SourceRepository>,
    tables: Arc<dyn SyncedTableRepository>,
    rows: Arc<dyn RowStore>,
    jobs: Arc<dyn SyncJobRepository>,
    connectors: Arc<dyn ConnectorFactory>,
    batch_size: usize,
    fetch_limit: Option<usize>,
}

impl SyncEngine {
    pub fn new(
        sources: Arc<dyn SourceRepository>,
        tables: Arc<dyn SyncedTableRepository>,
        rows: Arc<dyn RowStore>,
        jobs: Arc<dyn SyncJobRepository>,
        connectors: Arc<dyn ConnectorFactory>,
    ) -> Self {
        Self {
            sources,
            tables,
            rows,
            jobs,
            connectors,
            batch_size: DEFAULT_SYNC_BATCH_SIZE,
            fetch_limit: None,
        }
    }

    /// Rows per insert batch. Zero is treated as one.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Cap the number of rows fetched per table.
    pub fn with_fetch_limit(mut self, fetch_limit: Option<usize>) -> Self {
        self.fetch_limit = fetch_limit;
        self
    }

    /// Sync one registered table. Returns the number of rows written.
    #[instrument(skip(self))]
    pub async fn sync_table(&self, source_id: &str, table_name: &str) -> Result<usize> {
        let source = self.require_source(source_id).await?;
        let table = self.tables.find_table(source_id, table_name).await?.ok_or_else(|| {
            DashSyncError::NotRegistered {
                source_id: source_id.to_string(),
                table_name: table_name.to_string(),
            }
        })?;

        let connector = self.connectors.connect(&source).await?;
        self.run_table(&source, table, connector.as_ref()).await
    }

    /// Sync every registered table of a source, one after another. A failing
    /// table is reported in the summary without stopping the others.
    #[instrument(skip(self))]
    pub async fn sync_all(&self, source_id: &str) -> Result<SyncSummary> {
        let source = self.require_source(source_id).await?;
        let tables = self.tables.list_tables(source_id).await?;

        self.sources.update_sync_status(source_id, SyncStatus::Syncing).await?;

        let connector = match self.connectors.connect(&source).await {
            Ok(connector) => connector,
            Err(err) => {
                error!(source_id, error = %err, "could not connect to source");
                self.sources.update_sync_status(source_id, SyncStatus::Error).await?;
                return Err(err);
            }
        };

        let mut results = Vec::with_capacity(tables.len());
        for table in tables {
            let table_name = table.table_name.clone();
            match self.run_table(&source, table, connector.as_ref()).await {
                Ok(rows) => results.push(TableSyncResult::succeeded(table_name, rows)),
                Err(err) => results.push(TableSyncResult::failed(table_name, err.to_string())),
            }
        }

        let summary = SyncSummary::from_results(source_id, results);
        let status = if summary.failed_count == 0 { SyncStatus::Active } else { SyncStatus::Error };
        self.sources.update_sync_status(source_id, status).await?;

        info!(
            source_id,
            total_tables = summary.total_tables,
            success_count = summary.success_count,
            failed_count = summary.failed_count,
            total_rows = summary.total_rows,
            "source sync finished"
        );
        Ok(summary)
    }

    /// Source, recent jobs (newest first) and registered tables.
    pub async fn status(&self, source_id: &str) -> Result<SyncStatusReport> {
        let source = self.require_source(source_id).await?;
        let recent_jobs = self.jobs.recent_jobs(source_id, RECENT_SYNC_JOBS_LIMIT).await?;
        let tables = self.tables.list_tables(source_id).await?;
        Ok(SyncStatusReport { source, recent_jobs, tables })
    }

    async fn run_table(
        &self,
        source: &ExternalSource,
        mut table: SyncedTable,
        connector: &dyn SourceConnector,
    ) -> Result<usize> {
        let mut job = SyncJob {
            id: Uuid::now_v7().to_string(),
            source_id: source.id.clone(),
            table_name: table.table_name.clone(),
            status: SyncJobStatus::Running,
            rows_synced: 0,
            error_message: None,
            started_at: Utc::now(),
            completed_at: None,
        };
        self.jobs.insert_job(&job).await?;

        let outcome = self.copy_table(source, &mut table, connector).await;

        job.completed_at = Some(Utc::now());
        match &outcome {
            Ok(rows) => {
                job.status = SyncJobStatus::Completed;
                job.rows_synced = *rows as i64;
                info!(source_id = %source.id, table = %table.table_name, rows, "table synced");
            }
            Err(err) => {
                job.status = SyncJobStatus::Error;
                job.error_message = Some(err.to_string());
                warn!(
                    source_id = %source.id,
                    table = %table.table_name,
                    error = %err,
                    "table sync failed"
                );
            }
        }
        if let Err(err) = self.jobs.update_job(&job).await {
            error!(job_id = %job.id, error = %err, "failed to record sync job outcome");
        }

        outcome
    }

    async fn copy_table(
        &self,
        source: &ExternalSource,
        table: &mut SyncedTable,
        connector: &dyn SourceConnector,
    ) -> Result<usize> {
        let documents = connector.fetch_all(&table.table_name, self.fetch_limit).await?;

        if table.columns.is_empty() {
            if let Some(first) = documents.first() {
                table.columns = first.infer_columns();
            }
        }

        let rows: Vec<NewRow> = documents
            .into_iter()
            .map(|document| NewRow { original_id: original_id(&document), document })
            .collect();
        let written = self.rows.replace_rows(table, rows, self.batch_size).await?;

        let now = Utc::now();
        table.row_count = written as i64;
        table.last_schema_synced_at = Some(now);
        table.last_data_synced_at = Some(now);
        self.tables.update_table(table).await?;
        self.sources.mark_synced(&source.id, now).await?;

        Ok(written)
    }

    async fn require_source(&self, source_id: &str) -> Result<ExternalSource> {
        self.sources
            .get_source(source_id)
            .await?
            .ok_or_else(|| DashSyncError::NotFound(format!("source {source_id}")))
    }
}

/// Identifier for a fetched row: its `id` field as text, else a BLAKE3 digest
/// of the row's canonical JSON.
pub fn original_id(document: &Document) -> String {
    match document.present("id").and_then(|value| value.as_text()) {
        Some(id) => id,
        None => blake3::hash(document.to_json_string().as_bytes()).to_hex().to_string(),
    }
}
