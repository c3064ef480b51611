//! Port interfaces for dashboard configuration

use async_trait::async_trait;
use dashsync_domain::{DashboardConfigRecord, DiscoveredTable, GeneratedConfig, Result};

/// Stored dashboard configuration, one per source
#[async_trait]
pub trait DashboardConfigRepository: Send + Sync {
    async fn get_config(&self, source_id: &str) -> Result<Option<DashboardConfigRecord>>;

    /// Insert or replace the source's configuration
    async fn save_config(&self, record: &DashboardConfigRecord) -> Result<()>;

    async fn delete_config(&self, source_id: &str) -> Result<bool>;
}

/// Proposes charts and KPIs for a set of discovered tables.
#[async_trait]
pub trait ConfigGenerator: Send + Sync {
    async fn generate(&self, tables: &[DiscoveredTable]) -> Result<GeneratedConfig>;
}
