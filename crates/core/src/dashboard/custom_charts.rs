//! User-defined charts

use std::sync::Arc;

use chrono::Utc;
use dashsync_domain::constants::CUSTOM_ITEM_PREFIX;
use dashsync_domain::{
    is_custom_item_id, CustomChartConfig, CustomChartEntry, DashSyncError, Result,
};
use tracing::info;
use uuid::Uuid;

use crate::aggregation::AggregationEngine;
use crate::cache::ports::CustomChartRepository;

pub struct CustomChartService {
    charts: Arc<dyn CustomChartRepository>,
    engine: Arc<AggregationEngine>,
}

impl CustomChartService {
    pub fn new(charts: Arc<dyn CustomChartRepository>, engine: Arc<AggregationEngine>) -> Self {
        Self { charts, engine }
    }

    /// Compute and store a custom chart. A blank id gets a fresh
    /// `custom_<uuid>` id; any other id must carry the `custom_` prefix.
    pub async fn save(
        &self,
        source_id: &str,
        mut config: CustomChartConfig,
    ) -> Result<CustomChartEntry> {
        if config.data_source.table.trim().is_empty() || config.data_source.x_axis.trim().is_empty()
        {
            return Err(DashSyncError::InvalidInput(
                "custom chart needs a table and an x axis".into(),
            ));
        }
        if config.id.trim().is_empty() {
            config.id = format!("{CUSTOM_ITEM_PREFIX}{}", Uuid::new_v4());
        } else if !config.has_custom_id() {
            return Err(invalid_id(&config.id));
        }

        let entry = self.compute(source_id, config).await?;
        info!(
            source_id,
            chart_id = %entry.config.id,
            rows = entry.data.len(),
            "custom chart saved"
        );
        Ok(entry)
    }

    pub async fn list(&self, source_id: &str) -> Result<Vec<CustomChartEntry>> {
        self.charts.list_charts(source_id).await
    }

    /// Recompute a saved chart against the current rows.
    pub async fn refresh(&self, source_id: &str, chart_id: &str) -> Result<CustomChartEntry> {
        let existing = self
            .charts
            .get_chart(source_id, chart_id)
            .await?
            .ok_or_else(|| DashSyncError::NotFound(format!("custom chart {chart_id}")))?;
        self.compute(source_id, existing.config).await
    }

    pub async fn delete(&self, source_id: &str, chart_id: &str) -> Result<()> {
        if !is_custom_item_id(chart_id) {
            return Err(invalid_id(chart_id));
        }
        if !self.charts.delete_chart(source_id, chart_id).await? {
            return Err(DashSyncError::NotFound(format!("custom chart {chart_id}")));
        }
        info!(source_id, chart_id, "custom chart deleted");
        Ok(())
    }

    async fn compute(
        &self,
        source_id: &str,
        config: CustomChartConfig,
    ) -> Result<CustomChartEntry> {
        let data = self.engine.compute_custom(source_id, &config).await?;
        let entry = CustomChartEntry {
            source_id: source_id.to_string(),
            config,
            data,
            computed_at: Utc::now(),
        };
        self.charts.save_chart(&entry).await?;
        Ok(entry)
    }
}

fn invalid_id(chart_id: &str) -> DashSyncError {
    DashSyncError::InvalidInput(format!(
        "custom chart ids must start with '{CUSTOM_ITEM_PREFIX}', got '{chart_id}'"
    ))
}
