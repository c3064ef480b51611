//! User-defined charts built outside the generated dashboard configuration

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::dashboard::{Aggregation, ChartType, Filter};
use super::document::Document;
use crate::constants::CUSTOM_ITEM_PREFIX;

/// Table and columns a custom chart reads from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomDataSource {
    pub table: String,
    #[serde(rename = "xAxis")]
    pub x_axis: String,
    #[serde(rename = "yAxis", default)]
    pub y_axis: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomChartConfig {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "chartType", default)]
    pub chart_type: ChartType,
    #[serde(rename = "dataSource")]
    pub data_source: CustomDataSource,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub aggregation: Aggregation,
    #[serde(rename = "groupBy", default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,
}

impl CustomChartConfig {
    /// Column the chart groups on: `group_by` when set, else the x axis.
    pub fn group_column(&self) -> &str {
        self.group_by
            .as_deref()
            .filter(|column| !column.trim().is_empty())
            .unwrap_or(&self.data_source.x_axis)
    }

    pub fn has_custom_id(&self) -> bool {
        is_custom_item_id(&self.id)
    }
}

/// A saved custom chart with its last computed rows. Each row maps the x
/// axis name to the group key and every y axis name to its aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomChartEntry {
    pub source_id: String,
    pub config: CustomChartConfig,
    pub data: Vec<Document>,
    pub computed_at: DateTime<Utc>,
}

pub fn is_custom_item_id(id: &str) -> bool {
    id.starts_with(CUSTOM_ITEM_PREFIX)
}
