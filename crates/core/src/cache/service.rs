//! Result cache service
//!
//! Writes for one source are serialized through a per-source async mutex so
//! a bulk refresh (clear, then repopulate) is never interleaved with another
//! writer for the same source. A source's lock is dropped from the map once
//! no task holds it.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use dashsync_domain::{
    CacheEntry, CachedDashboard, ChartData, ChartSpec, DashSyncError, DashboardItem, ItemKind,
    ItemResult, KpiSpec, KpiValue, RefreshSummary, Result, StalenessReport,
};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::ports::CacheRepository;
use crate::aggregation::AggregationEngine;
use crate::sources::ports::SourceRepository;

pub struct CacheService {
    cache: Arc<dyn CacheRepository>,
    sources: Arc<dyn SourceRepository>,
    engine: Arc<AggregationEngine>,
    writers: DashMap<String, Arc<Mutex<()>>>,
}

impl CacheService {
    pub fn new(
        cache: Arc<dyn CacheRepository>,
        sources: Arc<dyn SourceRepository>,
        engine: Arc<AggregationEngine>,
    ) -> Self {
        Self { cache, sources, engine, writers: DashMap::new() }
    }

    /// Store (or overwrite) the computed result for one item.
    pub async fn put(
        &self,
        source_id: &str,
        item: DashboardItem,
        result: ItemResult,
    ) -> Result<CacheEntry> {
        let writer = self.writer(source_id);
        let outcome = {
            let _guard = writer.lock().await;
            self.write_entry(source_id, item, result).await
        };
        self.release_writer(source_id, writer);
        outcome
    }

    /// Cached charts and KPIs for a source, each in computed-at order.
    pub async fn get_all(&self, source_id: &str) -> Result<CachedDashboard> {
        let mut dashboard = CachedDashboard::default();
        for entry in self.cache.list_entries(source_id).await? {
            match entry.kind() {
                ItemKind::Chart => dashboard.charts.push(entry),
                ItemKind::Kpi => dashboard.kpis.push(entry),
            }
        }
        Ok(dashboard)
    }

    /// Delete every cached entry for a source.
    pub async fn clear(&self, source_id: &str) -> Result<usize> {
        let writer = self.writer(source_id);
        let removed = {
            let _guard = writer.lock().await;
            self.cache.clear_entries(source_id).await
        };
        self.release_writer(source_id, writer);
        let removed = removed?;
        debug!(source_id, removed, "cache cleared");
        Ok(removed)
    }

    pub async fn is_stale(&self, source_id: &str) -> Result<bool> {
        Ok(self.staleness(source_id).await?.needs_refresh)
    }

    /// Stale when there are no entries, or the source synced strictly after
    /// the newest entry was computed.
    pub async fn staleness(&self, source_id: &str) -> Result<StalenessReport> {
        let source = self
            .sources
            .get_source(source_id)
            .await?
            .ok_or_else(|| DashSyncError::NotFound(format!("source {source_id}")))?;
        let last_cached_at = self.cache.latest_computed_at(source_id).await?;

        let needs_refresh = match (source.last_synced_at, last_cached_at) {
            (_, None) => true,
            (Some(synced), Some(cached)) => synced > cached,
            (None, Some(_)) => false,
        };
        Ok(StalenessReport { last_synced_at: source.last_synced_at, last_cached_at, needs_refresh })
    }

    /// Replace the source's cache with fresh results for `charts` and `kpis`.
    /// Items that fail to compute are cached with an empty result.
    #[instrument(skip(self, charts, kpis), fields(charts = charts.len(), kpis = kpis.len()))]
    pub async fn refresh_all(
        &self,
        source_id: &str,
        charts: &[ChartSpec],
        kpis: &[KpiSpec],
    ) -> Result<RefreshSummary> {
        let writer = self.writer(source_id);
        let outcome = {
            let _guard = writer.lock().await;
            self.repopulate(source_id, charts, kpis).await
        };
        self.release_writer(source_id, writer);
        outcome
    }

    /// Sources with a writer lock currently held or awaited.
    pub fn active_writers(&self) -> usize {
        self.writers.len()
    }

    async fn repopulate(
        &self,
        source_id: &str,
        charts: &[ChartSpec],
        kpis: &[KpiSpec],
    ) -> Result<RefreshSummary> {
        self.cache.clear_entries(source_id).await?;
        let mut summary = RefreshSummary::default();

        for spec in charts {
            let data = match self.engine.compute_chart(source_id, spec).await {
                Ok(data) => data,
                Err(err) => {
                    warn!(source_id, chart_id = %spec.id, error = %err, "chart degraded to empty");
                    summary.failed_items.push(spec.id.clone());
                    ChartData::Empty
                }
            };
            self.write_entry(source_id, DashboardItem::Chart(spec.clone()), ItemResult::Chart(data))
                .await?;
            summary.charts_cached += 1;
        }

        for spec in kpis {
            let value = match self.engine.compute_kpi(source_id, spec).await {
                Ok(value) => value,
                Err(err) => {
                    warn!(source_id, kpi_id = %spec.id, error = %err, "kpi degraded to empty");
                    summary.failed_items.push(spec.id.clone());
                    KpiValue::default()
                }
            };
            self.write_entry(source_id, DashboardItem::Kpi(spec.clone()), ItemResult::Kpi(value))
                .await?;
            summary.kpis_cached += 1;
        }

        info!(
            source_id,
            charts_cached = summary.charts_cached,
            kpis_cached = summary.kpis_cached,
            failed = summary.failed_items.len(),
            "cache refreshed"
        );
        Ok(summary)
    }

    async fn write_entry(
        &self,
        source_id: &str,
        item: DashboardItem,
        result: ItemResult,
    ) -> Result<CacheEntry> {
        let entry = CacheEntry {
            source_id: source_id.to_string(),
            item_id: item.id().to_string(),
            item,
            result,
            computed_at: Utc::now(),
        };
        self.cache.upsert_entry(&entry).await?;
        Ok(entry)
    }

    fn writer(&self, source_id: &str) -> Arc<Mutex<()>> {
        self.writers.entry(source_id.to_string()).or_default().clone()
    }

    /// Forget the lock when the map holds the last reference. The check runs
    /// under the shard lock, so no task can clone it concurrently.
    fn release_writer(&self, source_id: &str, writer: Arc<Mutex<()>>) {
        drop(writer);
        self.writers.remove_if(source_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}
