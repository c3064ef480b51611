//! Dashboard orchestrator
//!
//! `load` serves a fresh, non-empty cache directly. Otherwise it runs the
//! cold path: discover tables, take the stored configuration (or generate and
//! store one), refresh the cache and return the new entries.

use std::sync::Arc;

use chrono::Utc;
use dashsync_domain::{
    CachedDashboard, DashboardConfig, DashboardConfigRecord, RefreshSummary, Result,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::discovery::DiscoveryService;
use super::ports::{ConfigGenerator, DashboardConfigRepository};
use crate::cache::CacheService;

/// Dashboard returned by [`DashboardOrchestrator::load`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadedDashboard {
    pub dashboard: CachedDashboard,
    /// True when served without recomputing anything.
    pub from_cache: bool,
    /// Refresh outcome on the cold path.
    pub refresh: Option<RefreshSummary>,
}

pub struct DashboardOrchestrator {
    cache: Arc<CacheService>,
    discovery: Arc<DiscoveryService>,
    configs: Arc<dyn DashboardConfigRepository>,
    generator: Arc<dyn ConfigGenerator>,
}

impl DashboardOrchestrator {
    pub fn new(
        cache: Arc<CacheService>,
        discovery: Arc<DiscoveryService>,
        configs: Arc<dyn DashboardConfigRepository>,
        generator: Arc<dyn ConfigGenerator>,
    ) -> Self {
        Self { cache, discovery, configs, generator }
    }

    #[instrument(skip(self))]
    pub async fn load(&self, source_id: &str) -> Result<LoadedDashboard> {
        let cached = self.cache.get_all(source_id).await?;
        if !cached.is_empty() && !self.cache.is_stale(source_id).await? {
            info!(source_id, items = cached.len(), "dashboard served from cache");
            return Ok(LoadedDashboard { dashboard: cached, from_cache: true, refresh: None });
        }

        let config = self.resolve_config(source_id).await?;
        let refresh = self.cache.refresh_all(source_id, &config.charts, &config.kpis).await?;
        let dashboard = self.cache.get_all(source_id).await?;

        info!(source_id, items = dashboard.len(), "dashboard rebuilt");
        Ok(LoadedDashboard { dashboard, from_cache: false, refresh: Some(refresh) })
    }

    /// Drop the stored configuration and cache so the next `load` takes the
    /// cold path.
    #[instrument(skip(self))]
    pub async fn regenerate(&self, source_id: &str) -> Result<()> {
        let had_config = self.configs.delete_config(source_id).await?;
        let removed = self.cache.clear(source_id).await?;
        info!(source_id, had_config, removed, "dashboard reset for regeneration");
        Ok(())
    }

    /// Stored configuration for the source, if any.
    pub async fn stored_config(&self, source_id: &str) -> Result<Option<DashboardConfigRecord>> {
        self.configs.get_config(source_id).await
    }

    async fn resolve_config(&self, source_id: &str) -> Result<DashboardConfig> {
        let tables = self.discovery.discover(source_id).await?;

        if let Some(record) = self.configs.get_config(source_id).await? {
            return Ok(record.config.normalize());
        }

        let generated = self.generator.generate(&tables).await?;
        let config = generated.config.normalize();
        let now = Utc::now();
        let record = DashboardConfigRecord {
            source_id: source_id.to_string(),
            config: config.clone(),
            model: Some(generated.model).filter(|model| !model.is_empty()),
            reasoning: Some(generated.reasoning).filter(|reasoning| !reasoning.is_empty()),
            generated_at: now,
            updated_at: now,
        };
        self.configs.save_config(&record).await?;

        info!(
            source_id,
            charts = config.charts.len(),
            kpis = config.kpis.len(),
            "dashboard configuration generated"
        );
        Ok(config)
    }
}
