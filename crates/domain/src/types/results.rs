//! Computed aggregates and cache records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::dashboard::{DashboardItem, ItemKind};
use crate::impl_domain_status_conversions;

/// One labelled point of a grouped or time-series chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

impl ChartPoint {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self { label: label.into(), value }
    }
}

/// Date interpretation that produced a time series, in fallback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFormat {
    IsoT,
    IsoSpace,
    EpochSeconds,
    RawPrefix,
}

impl_domain_status_conversions!(DateFormat {
    IsoT => "iso_t",
    IsoSpace => "iso_space",
    EpochSeconds => "epoch_seconds",
    RawPrefix => "raw_prefix",
});

/// Normalized chart result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ChartData {
    /// Pie / explicit group column: sorted by value descending.
    Grouped { points: Vec<ChartPoint> },
    /// Date x column: one point per calendar day, ascending.
    TimeSeries { points: Vec<ChartPoint>, format: DateFormat },
    /// Non-date x column: sorted by value descending.
    Category { points: Vec<ChartPoint> },
    /// No x/group column. `row_count` counts the rows left after the chart's
    /// filters, not the whole table.
    Scalar { value: f64, row_count: i64 },
    /// Nothing to show (no data, or the item could not be computed).
    Empty,
}

impl ChartData {
    pub fn points(&self) -> &[ChartPoint] {
        match self {
            Self::Grouped { points } | Self::Category { points } => points,
            Self::TimeSeries { points, .. } => points,
            Self::Scalar { .. } | Self::Empty => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Scalar { .. } => false,
            _ => self.points().is_empty(),
        }
    }
}

/// KPI result: value rounded to 2 decimals, growth percentage to 1.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct KpiValue {
    pub value: f64,
    pub growth: f64,
    pub row_count: i64,
}

/// Result payload stored in a cache entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum ItemResult {
    Chart(ChartData),
    Kpi(KpiValue),
}

impl ItemResult {
    /// Empty result for an item of the given kind.
    pub fn empty(kind: ItemKind) -> Self {
        match kind {
            ItemKind::Chart => Self::Chart(ChartData::Empty),
            ItemKind::Kpi => Self::Kpi(KpiValue::default()),
        }
    }
}

/// A computed result for one dashboard item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub source_id: String,
    pub item_id: String,
    pub item: DashboardItem,
    pub result: ItemResult,
    pub computed_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn kind(&self) -> ItemKind {
        self.item.kind()
    }
}

/// Cached dashboard for a source, split by item kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CachedDashboard {
    pub charts: Vec<CacheEntry>,
    pub kpis: Vec<CacheEntry>,
}

impl CachedDashboard {
    pub fn is_empty(&self) -> bool {
        self.charts.is_empty() && self.kpis.is_empty()
    }

    pub fn len(&self) -> usize {
        self.charts.len() + self.kpis.len()
    }
}

/// Sync time versus cache time for one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StalenessReport {
    pub last_synced_at: Option<DateTime<Utc>>,
    pub last_cached_at: Option<DateTime<Utc>>,
    pub needs_refresh: bool,
}

/// Outcome of a bulk cache refresh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefreshSummary {
    pub charts_cached: usize,
    pub kpis_cached: usize,
    /// Item ids that degraded to an empty result.
    pub failed_items: Vec<String>,
}
