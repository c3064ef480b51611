//! Port interfaces for cached results

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashsync_domain::{CacheEntry, CustomChartEntry, Result};

#[async_trait]
pub trait CacheRepository: Send + Sync {
    /// Insert or overwrite the entry for (source_id, item_id)
    async fn upsert_entry(&self, entry: &CacheEntry) -> Result<()>;

    /// All entries for a source, ordered by computed-at ascending
    async fn list_entries(&self, source_id: &str) -> Result<Vec<CacheEntry>>;

    /// Delete every entry for a source. Returns the number removed.
    async fn clear_entries(&self, source_id: &str) -> Result<usize>;

    /// Newest computed-at among a source's entries
    async fn latest_computed_at(&self, source_id: &str) -> Result<Option<DateTime<Utc>>>;
}

/// Saved custom charts and their last computed rows
#[async_trait]
pub trait CustomChartRepository: Send + Sync {
    async fn save_chart(&self, entry: &CustomChartEntry) -> Result<()>;

    /// Charts for a source, newest first
    async fn list_charts(&self, source_id: &str) -> Result<Vec<CustomChartEntry>>;

    async fn get_chart(&self, source_id: &str, chart_id: &str) -> Result<Option<CustomChartEntry>>;

    async fn delete_chart(&self, source_id: &str, chart_id: &str) -> Result<bool>;
}
