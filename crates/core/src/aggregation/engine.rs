//! Chart, KPI and custom-chart computation
//!
//! Rows are read from the [`RowStore`] already scoped to one source and table
//! and narrowed by the item's filters. Grouping, date bucketing and the
//! aggregate itself run here so every store backend shares one set of cast
//! and fallback rules.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use dashsync_domain::constants::{
    DATE_COLUMN_KEYWORDS, GROWTH_WINDOW_DAYS, MAX_CUSTOM_CHART_GROUPS, MAX_GROUPS,
    MAX_SERIES_POINTS, UNKNOWN_GROUP_KEY,
};
use dashsync_domain::{
    Aggregation, ChartData, ChartPoint, ChartSpec, ChartType, CustomChartConfig, DashSyncError,
    DashboardItem, DocValue, Document, ItemResult, KpiSpec, KpiValue, Result,
};
use tracing::warn;

use super::dates::bucket_days;
use super::grouping::{round1, round2, Accumulator, Grouper};
use crate::sync::ports::{RowQuery, RowStore};

/// Which result shape a chart spec produces, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartMode<'a> {
    /// Pie chart or explicit group column, keyed by this column.
    Grouped(&'a str),
    /// Date-like x column.
    TimeSeries(&'a str),
    /// Any other x column.
    Category(&'a str),
    /// No x or group column.
    Scalar,
    /// Pie chart with nothing to group on.
    Ungroupable,
}

impl<'a> ChartMode<'a> {
    pub fn select(spec: &'a ChartSpec) -> Self {
        let x = non_blank(spec.columns.x.as_deref());
        let group_by = non_blank(spec.columns.group_by.as_deref());

        if spec.chart_type == ChartType::Pie || group_by.is_some() {
            return match group_by.or(x) {
                Some(column) => Self::Grouped(column),
                None => Self::Ungroupable,
            };
        }
        match x {
            Some(column) if is_date_column(column) => Self::TimeSeries(column),
            Some(column) => Self::Category(column),
            None => Self::Scalar,
        }
    }
}

/// True when the column name contains a date-like keyword.
pub fn is_date_column(column: &str) -> bool {
    let lowered = column.to_ascii_lowercase();
    DATE_COLUMN_KEYWORDS.iter().any(|keyword| lowered.contains(keyword))
}

/// Computes chart, KPI and custom-chart results over the row store.
pub struct AggregationEngine {
    rows: Arc<dyn RowStore>,
}

impl AggregationEngine {
    pub fn new(rows: Arc<dyn RowStore>) -> Self {
        Self { rows }
    }

    /// Compute any dashboard item.
    pub async fn compute(&self, source_id: &str, item: &DashboardItem) -> Result<ItemResult> {
        match item {
            DashboardItem::Chart(spec) => {
                self.compute_chart(source_id, spec).await.map(ItemResult::Chart)
            }
            DashboardItem::Kpi(spec) => {
                self.compute_kpi(source_id, spec).await.map(ItemResult::Kpi)
            }
        }
    }

    pub async fn compute_chart(&self, source_id: &str, spec: &ChartSpec) -> Result<ChartData> {
        require_table(&spec.table, &spec.id)?;
        require_value_column(spec.aggregation, spec.columns.y.as_deref(), &spec.id)?;

        let query = RowQuery::new(source_id, spec.table.trim()).with_filters(&spec.filters);
        let documents = self.rows.scan(&query).await?;
        Ok(chart_from_documents(spec, &documents))
    }

    pub async fn compute_kpi(&self, source_id: &str, spec: &KpiSpec) -> Result<KpiValue> {
        require_table(&spec.table, &spec.id)?;
        require_value_column(spec.aggregation, Some(spec.column.as_str()), &spec.id)?;

        let query = RowQuery::new(source_id, spec.table.trim()).with_filters(&spec.filters);
        let documents = self.rows.scan(&query).await?;
        if documents.is_empty() {
            return Ok(KpiValue::default());
        }

        let mut accumulator = Accumulator::new(spec.aggregation);
        for document in &documents {
            accumulator.push(document.present(spec.column.trim()));
        }

        // Growth is only defined for counts; other aggregations report 0.
        let growth = if spec.aggregation == Aggregation::Count && spec.compares_previous_period() {
            match self.previous_period_growth(&query).await {
                Ok(growth) => growth,
                Err(err) => {
                    warn!(kpi_id = %spec.id, error = %err, "growth comparison failed");
                    0.0
                }
            }
        } else {
            0.0
        };

        Ok(KpiValue {
            value: round2(accumulator.finish()),
            growth: round1(growth),
            row_count: documents.len() as i64,
        })
    }

    /// Rows for a custom chart: one per group, keyed by the x axis name plus
    /// one aggregate per y axis column.
    pub async fn compute_custom(
        &self,
        source_id: &str,
        config: &CustomChartConfig,
    ) -> Result<Vec<Document>> {
        let source = &config.data_source;
        if source.table.trim().is_empty()
            || source.x_axis.trim().is_empty()
            || source.y_axis.is_empty()
        {
            return Ok(Vec::new());
        }

        let query = RowQuery::new(source_id, source.table.trim()).with_filters(&config.filters);
        let documents = self.rows.scan(&query).await?;
        Ok(custom_rows(config, &documents))
    }

    async fn previous_period_growth(&self, query: &RowQuery) -> Result<f64> {
        let now = Utc::now();
        let window = Duration::days(GROWTH_WINDOW_DAYS);
        let recent = self.rows.count_synced_between(query, now - window, None).await?;
        let previous =
            self.rows.count_synced_between(query, now - window * 2, Some(now - window)).await?;
        Ok(growth_percent(recent, previous))
    }
}

/// Chart result for an already-filtered document set.
pub fn chart_from_documents(spec: &ChartSpec, documents: &[Document]) -> ChartData {
    let y = non_blank(spec.columns.y.as_deref());

    match ChartMode::select(spec) {
        ChartMode::Grouped(column) => {
            ChartData::Grouped { points: group_by_value(spec.aggregation, column, y, documents) }
        }
        ChartMode::Category(column) => {
            ChartData::Category { points: group_by_value(spec.aggregation, column, y, documents) }
        }
        ChartMode::TimeSeries(column) => {
            let Some((format, days)) = bucket_days(documents.iter().map(|d| d.present(column)))
            else {
                return ChartData::Empty;
            };
            let mut grouper = Grouper::new(spec.aggregation);
            for (document, day) in documents.iter().zip(days) {
                if let Some(day) = day {
                    grouper.push(day, value_of(document, y));
                }
            }
            ChartData::TimeSeries { points: grouper.by_key(MAX_SERIES_POINTS), format }
        }
        ChartMode::Scalar => {
            let mut accumulator = Accumulator::new(spec.aggregation);
            for document in documents {
                accumulator.push(value_of(document, y));
            }
            ChartData::Scalar {
                value: round2(accumulator.finish()),
                row_count: documents.len() as i64,
            }
        }
        ChartMode::Ungroupable => ChartData::Empty,
    }
}

fn group_by_value(
    aggregation: Aggregation,
    column: &str,
    y: Option<&str>,
    documents: &[Document],
) -> Vec<ChartPoint> {
    let mut grouper = Grouper::new(aggregation);
    for document in documents {
        let key = document
            .present(column)
            .and_then(DocValue::as_text)
            .unwrap_or_else(|| UNKNOWN_GROUP_KEY.to_string());
        grouper.push(key, value_of(document, y));
    }
    grouper.by_value_desc(MAX_GROUPS)
}

fn value_of<'d>(document: &'d Document, y: Option<&str>) -> Option<&'d DocValue> {
    y.and_then(|column| document.present(column))
}

/// Custom chart rows for an already-filtered document set. Rows without the
/// group column are left out; groups are ordered by key.
pub fn custom_rows(config: &CustomChartConfig, documents: &[Document]) -> Vec<Document> {
    let group_column = config.group_column().trim();
    let y_axis = &config.data_source.y_axis;

    let mut groups: BTreeMap<String, Vec<Accumulator>> = BTreeMap::new();
    for document in documents {
        let Some(key) = document.present(group_column).and_then(DocValue::as_text) else {
            continue;
        };
        let accumulators = groups
            .entry(key)
            .or_insert_with(|| vec![Accumulator::new(config.aggregation); y_axis.len()]);
        for (accumulator, column) in accumulators.iter_mut().zip(y_axis) {
            accumulator.push(document.present(column));
        }
    }

    groups
        .into_iter()
        .take(MAX_CUSTOM_CHART_GROUPS)
        .map(|(key, accumulators)| {
            let mut row = Document::new().with(config.data_source.x_axis.clone(), key.as_str());
            for (accumulator, column) in accumulators.iter().zip(y_axis) {
                row.insert(column.clone(), DocValue::Float(round2(accumulator.finish())));
            }
            row
        })
        .collect()
}

/// Percent change from `previous` to `recent`; 0 when there is no previous
/// activity.
pub fn growth_percent(recent: i64, previous: i64) -> f64 {
    if previous > 0 {
        (recent - previous) as f64 / previous as f64 * 100.0
    } else {
        0.0
    }
}

fn non_blank(column: Option<&str>) -> Option<&str> {
    column.map(str::trim).filter(|column| !column.is_empty())
}

fn require_table(table: &str, item_id: &str) -> Result<()> {
    if table.trim().is_empty() {
        return Err(DashSyncError::Aggregation(format!("item {item_id} has no table")));
    }
    Ok(())
}

fn require_value_column(
    aggregation: Aggregation,
    column: Option<&str>,
    item_id: &str,
) -> Result<()> {
    if aggregation != Aggregation::Count && non_blank(column).is_none() {
        return Err(DashSyncError::Aggregation(format!(
            "item {item_id} uses {aggregation} without a value column"
        )));
    }
    Ok(())
}
