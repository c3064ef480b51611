//! In-memory repository mocks
//!
//! Provides in-memory implementations of the core storage ports so service
//! tests run deterministically without a database.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashsync_core::cache::ports::{CacheRepository, CustomChartRepository};
use dashsync_core::dashboard::ports::DashboardConfigRepository;
use dashsync_core::sources::ports::{SourceRepository, SyncedTableRepository};
use dashsync_core::sync::ports::{RowQuery, RowStore, SyncJobRepository};
use dashsync_domain::{
    matches_all, CacheEntry, CustomChartEntry, DashSyncError, DashboardConfigRecord, Document,
    ExternalSource, NewRow, Result as DomainResult, SyncJob, SyncStatus, SyncedRow, SyncedTable,
};

/// In-memory mock for `SourceRepository`.
#[derive(Default, Clone)]
pub struct MockSourceRepository {
    sources: Arc<Mutex<HashMap<String, ExternalSource>>>,
    /// Every status written, in order.
    pub status_history: Arc<Mutex<Vec<SyncStatus>>>,
}

impl MockSourceRepository {
    pub fn source(&self, id: &str) -> Option<ExternalSource> {
        self.sources.lock().unwrap().get(id).cloned()
    }

    /// Overwrite the last-synced timestamp directly.
    pub fn set_last_synced(&self, id: &str, at: Option<DateTime<Utc>>) {
        if let Some(source) = self.sources.lock().unwrap().get_mut(id) {
            source.last_synced_at = at;
        }
    }
}

#[async_trait]
impl SourceRepository for MockSourceRepository {
    async fn insert_source(&self, source: &ExternalSource) -> DomainResult<()> {
        self.sources.lock().unwrap().insert(source.id.clone(), source.clone());
        Ok(())
    }

    async fn get_source(&self, id: &str) -> DomainResult<Option<ExternalSource>> {
        Ok(self.source(id))
    }

    async fn list_sources(&self) -> DomainResult<Vec<ExternalSource>> {
        Ok(self.sources.lock().unwrap().values().cloned().collect())
    }

    async fn update_sync_status(&self, id: &str, status: SyncStatus) -> DomainResult<()> {
        self.status_history.lock().unwrap().push(status);
        if let Some(source) = self.sources.lock().unwrap().get_mut(id) {
            source.sync_status = status;
        }
        Ok(())
    }

    async fn mark_synced(&self, id: &str, synced_at: DateTime<Utc>) -> DomainResult<()> {
        self.set_last_synced(id, Some(synced_at));
        Ok(())
    }

    async fn delete_source(&self, id: &str) -> DomainResult<bool> {
        Ok(self.sources.lock().unwrap().remove(id).is_some())
    }
}

/// In-memory mock for `SyncedTableRepository`.
#[derive(Default, Clone)]
pub struct MockTableRepository {
    tables: Arc<Mutex<Vec<SyncedTable>>>,
}

impl MockTableRepository {
    pub fn table(&self, source_id: &str, table_name: &str) -> Option<SyncedTable> {
        self.tables
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.source_id == source_id && t.table_name == table_name)
            .cloned()
    }
}

#[async_trait]
impl SyncedTableRepository for MockTableRepository {
    async fn find_table(
        &self,
        source_id: &str,
        table_name: &str,
    ) -> DomainResult<Option<SyncedTable>> {
        Ok(self.table(source_id, table_name))
    }

    async fn insert_table(&self, table: &SyncedTable) -> DomainResult<()> {
        if self.table(&table.source_id, &table.table_name).is_none() {
            self.tables.lock().unwrap().push(table.clone());
        }
        Ok(())
    }

    async fn list_tables(&self, source_id: &str) -> DomainResult<Vec<SyncedTable>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.source_id == source_id)
            .cloned()
            .collect())
    }

    async fn update_table(&self, table: &SyncedTable) -> DomainResult<()> {
        let mut tables = self.tables.lock().unwrap();
        match tables.iter_mut().find(|t| t.id == table.id) {
            Some(existing) => {
                *existing = table.clone();
                Ok(())
            }
            None => Err(DashSyncError::NotFound(format!("synced table {}", table.id))),
        }
    }
}

/// In-memory mock for `RowStore`.
///
/// Replacement is all-or-nothing like the SQLite store. `fail_on_batch`
/// makes the given 1-based batch fail.
#[derive(Default, Clone)]
pub struct MockRowStore {
    rows: Arc<Mutex<Vec<SyncedRow>>>,
    next_id: Arc<Mutex<i64>>,
    fail_on_batch: Arc<Mutex<Option<usize>>>,
}

impl MockRowStore {
    pub fn fail_on_batch(&self, batch: Option<usize>) {
        *self.fail_on_batch.lock().unwrap() = batch;
    }

    /// Shift `synced_at` of the given table's rows into the past.
    pub fn backdate(&self, synced_table_id: &str, by: Duration, count: usize) {
        let mut rows = self.rows.lock().unwrap();
        for row in rows.iter_mut().filter(|r| r.synced_table_id == synced_table_id).take(count) {
            row.synced_at -= by;
        }
    }

    fn matching(&self, query: &RowQuery) -> Vec<SyncedRow> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.source_id == query.source_id && r.table_name == query.table_name)
            .filter(|r| matches_all(&query.filters, &r.document))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl RowStore for MockRowStore {
    async fn replace_rows(
        &self,
        table: &SyncedTable,
        rows: Vec<NewRow>,
        batch_size: usize,
    ) -> DomainResult<usize> {
        let failing = *self.fail_on_batch.lock().unwrap();
        let now = Utc::now();
        let mut staged = Vec::with_capacity(rows.len());
        let mut next_id = self.next_id.lock().unwrap();

        for (index, batch) in rows.chunks(batch_size.max(1)).enumerate() {
            if failing == Some(index + 1) {
                return Err(DashSyncError::BatchInsert {
                    batch_index: index + 1,
                    message: "injected failure".into(),
                });
            }
            for row in batch {
                *next_id += 1;
                staged.push(SyncedRow {
                    id: *next_id,
                    synced_table_id: table.id.clone(),
                    source_id: table.source_id.clone(),
                    table_name: table.table_name.clone(),
                    original_id: row.original_id.clone(),
                    document: row.document.clone(),
                    synced_at: now,
                });
            }
        }

        let written = staged.len();
        let mut stored = self.rows.lock().unwrap();
        stored.retain(|r| r.synced_table_id != table.id);
        stored.extend(staged);
        Ok(written)
    }

    async fn scan(&self, query: &RowQuery) -> DomainResult<Vec<Document>> {
        Ok(self.matching(query).into_iter().map(|r| r.document).collect())
    }

    async fn count(&self, query: &RowQuery) -> DomainResult<i64> {
        Ok(self.matching(query).len() as i64)
    }

    async fn count_synced_between(
        &self,
        query: &RowQuery,
        from: DateTime<Utc>,
        to: Option<DateTime<Utc>>,
    ) -> DomainResult<i64> {
        Ok(self
            .matching(query)
            .iter()
            .filter(|r| r.synced_at >= from && to.map_or(true, |to| r.synced_at < to))
            .count() as i64)
    }

    async fn sample(&self, synced_table_id: &str, limit: usize) -> DomainResult<Vec<Document>> {
        Ok(self.rows(synced_table_id).await?.into_iter().take(limit).map(|r| r.document).collect())
    }

    async fn rows(&self, synced_table_id: &str) -> DomainResult<Vec<SyncedRow>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.synced_table_id == synced_table_id)
            .cloned()
            .collect())
    }
}

/// In-memory mock for `SyncJobRepository`.
#[derive(Default, Clone)]
pub struct MockJobRepository {
    jobs: Arc<Mutex<Vec<SyncJob>>>,
}

#[async_trait]
impl SyncJobRepository for MockJobRepository {
    async fn insert_job(&self, job: &SyncJob) -> DomainResult<()> {
        self.jobs.lock().unwrap().push(job.clone());
        Ok(())
    }

    async fn update_job(&self, job: &SyncJob) -> DomainResult<()> {
        if let Some(existing) = self.jobs.lock().unwrap().iter_mut().find(|j| j.id == job.id) {
            *existing = job.clone();
        }
        Ok(())
    }

    async fn recent_jobs(&self, source_id: &str, limit: usize) -> DomainResult<Vec<SyncJob>> {
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|j| j.source_id == source_id)
            .take(limit)
            .cloned()
            .collect())
    }
}

/// In-memory mock for `CacheRepository`. Entries keep insertion order.
#[derive(Default, Clone)]
pub struct MockCacheRepository {
    entries: Arc<Mutex<Vec<CacheEntry>>>,
}

#[async_trait]
impl CacheRepository for MockCacheRepository {
    async fn upsert_entry(&self, entry: &CacheEntry) -> DomainResult<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|e| !(e.source_id == entry.source_id && e.item_id == entry.item_id));
        entries.push(entry.clone());
        Ok(())
    }

    async fn list_entries(&self, source_id: &str) -> DomainResult<Vec<CacheEntry>> {
        let mut entries: Vec<CacheEntry> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.source_id == source_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.computed_at);
        Ok(entries)
    }

    async fn clear_entries(&self, source_id: &str) -> DomainResult<usize> {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|e| e.source_id != source_id);
        Ok(before - entries.len())
    }

    async fn latest_computed_at(&self, source_id: &str) -> DomainResult<Option<DateTime<Utc>>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.source_id == source_id)
            .map(|e| e.computed_at)
            .max())
    }
}

/// In-memory mock for `CustomChartRepository`.
#[derive(Default, Clone)]
pub struct MockCustomChartRepository {
    charts: Arc<Mutex<Vec<CustomChartEntry>>>,
}

#[async_trait]
impl CustomChartRepository for MockCustomChartRepository {
    async fn save_chart(&self, entry: &CustomChartEntry) -> DomainResult<()> {
        let mut charts = self.charts.lock().unwrap();
        charts.retain(|c| !(c.source_id == entry.source_id && c.config.id == entry.config.id));
        charts.push(entry.clone());
        Ok(())
    }

    async fn list_charts(&self, source_id: &str) -> DomainResult<Vec<CustomChartEntry>> {
        Ok(self
            .charts
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|c| c.source_id == source_id)
            .cloned()
            .collect())
    }

    async fn get_chart(
        &self,
        source_id: &str,
        chart_id: &str,
    ) -> DomainResult<Option<CustomChartEntry>> {
        Ok(self
            .charts
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.source_id == source_id && c.config.id == chart_id)
            .cloned())
    }

    async fn delete_chart(&self, source_id: &str, chart_id: &str) -> DomainResult<bool> {
        let mut charts = self.charts.lock().unwrap();
        let before = charts.len();
        charts.retain(|c| !(c.source_id == source_id && c.config.id == chart_id));
        Ok(before != charts.len())
    }
}

/// In-memory mock for `DashboardConfigRepository`.
#[derive(Default, Clone)]
pub struct MockConfigRepository {
    configs: Arc<Mutex<HashMap<String, DashboardConfigRecord>>>,
}

#[async_trait]
impl DashboardConfigRepository for MockConfigRepository {
    async fn get_config(&self, source_id: &str) -> DomainResult<Option<DashboardConfigRecord>> {
        Ok(self.configs.lock().unwrap().get(source_id).cloned())
    }

    async fn save_config(&self, record: &DashboardConfigRecord) -> DomainResult<()> {
        self.configs.lock().unwrap().insert(record.source_id.clone(), record.clone());
        Ok(())
    }

    async fn delete_config(&self, source_id: &str) -> DomainResult<bool> {
        Ok(self.configs.lock().unwrap().remove(source_id).is_some())
    }
}
