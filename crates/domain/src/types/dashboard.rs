//! Declarative chart and KPI specifications

use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize};

use super::document::{parse_numeric, DocValue, Document};
use crate::constants::PREVIOUS_PERIOD_TAG;
use crate::impl_domain_status_conversions;

/// Aggregation function applied to the y/value column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Aggregation {
    #[default]
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl_domain_status_conversions!(Aggregation {
    Count => "count",
    Sum => "sum",
    Avg => "avg" | "average",
    Min => "min",
    Max => "max",
});

impl From<String> for Aggregation {
    fn from(raw: String) -> Self {
        raw.parse().unwrap_or_default()
    }
}

/// Presentation type of a chart. Only `pie` changes aggregation behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum ChartType {
    Line,
    #[default]
    Bar,
    Pie,
    Area,
    Stat,
}

impl_domain_status_conversions!(ChartType {
    Line => "line",
    Bar => "bar",
    Pie => "pie",
    Area => "area",
    Stat => "stat",
});

impl From<String> for ChartType {
    fn from(raw: String) -> Self {
        raw.parse().unwrap_or_default()
    }
}

/// Filter comparison operator. Unknown operators behave as `eq`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum FilterOperator {
    #[default]
    #[serde(rename = "eq")]
    Eq,
    #[serde(rename = "neq")]
    Neq,
    #[serde(rename = "gt")]
    Gt,
    #[serde(rename = "gte")]
    Gte,
    #[serde(rename = "lt")]
    Lt,
    #[serde(rename = "lte")]
    Lte,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "startsWith")]
    StartsWith,
}

impl_domain_status_conversions!(FilterOperator {
    Eq => "eq",
    Neq => "neq" | "ne",
    Gt => "gt",
    Gte => "gte",
    Lt => "lt",
    Lte => "lte",
    Contains => "contains",
    StartsWith => "startswith" | "starts_with",
});

impl From<String> for FilterOperator {
    fn from(raw: String) -> Self {
        raw.parse().unwrap_or_default()
    }
}

/// One filter predicate. Filters are AND-combined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    #[serde(default)]
    pub operator: FilterOperator,
    #[serde(deserialize_with = "deserialize_filter_value")]
    pub value: String,
}

impl Filter {
    pub fn new(
        field: impl Into<String>,
        operator: FilterOperator,
        value: impl Into<String>,
    ) -> Self {
        Self { field: field.into(), operator, value: value.into() }
    }

    /// Filters with a blank field or value are skipped entirely.
    pub fn is_valid(&self) -> bool {
        !self.field.trim().is_empty() && !self.value.is_empty()
    }

    /// Numeric form of the filter value when it looks numeric.
    pub fn numeric_value(&self) -> Option<f64> {
        parse_numeric(&self.value)
    }

    /// Evaluates the predicate against one document. A missing or null field
    /// never matches.
    pub fn matches(&self, document: &Document) -> bool {
        let Some(value) = document.present(&self.field) else {
            return false;
        };
        let Some(text) = value.as_text() else {
            return false;
        };
        let number = value.as_f64();
        let target = self.numeric_value();

        match self.operator {
            FilterOperator::Eq => {
                text == self.value
                    || matches!((number, target), (Some(a), Some(b)) if nearly_equal(a, b))
            }
            FilterOperator::Neq => {
                text != self.value
                    || matches!((number, target), (Some(a), Some(b)) if !nearly_equal(a, b))
            }
            FilterOperator::Gt => compare(number, target, |a, b| a > b),
            FilterOperator::Gte => compare(number, target, |a, b| a >= b),
            FilterOperator::Lt => compare(number, target, |a, b| a < b),
            FilterOperator::Lte => compare(number, target, |a, b| a <= b),
            FilterOperator::Contains => {
                text.to_ascii_lowercase().contains(&self.value.to_ascii_lowercase())
            }
            FilterOperator::StartsWith => {
                text.to_ascii_lowercase().starts_with(&self.value.to_ascii_lowercase())
            }
        }
    }
}

/// True when every valid filter matches; invalid filters are ignored.
pub fn matches_all(filters: &[Filter], document: &Document) -> bool {
    filters.iter().filter(|f| f.is_valid()).all(|f| f.matches(document))
}

fn compare(number: Option<f64>, target: Option<f64>, op: impl Fn(f64, f64) -> bool) -> bool {
    matches!((number, target), (Some(a), Some(b)) if op(a, b))
}

fn nearly_equal(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn deserialize_filter_value<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(DocValue::from(value).as_text().unwrap_or_default())
}

/// Column selection for a chart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartColumns {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    #[serde(default, rename = "groupBy", skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,
}

/// Declarative chart definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default)]
    pub chart_type: ChartType,
    pub table: String,
    #[serde(default)]
    pub columns: ChartColumns,
    #[serde(default)]
    pub aggregation: Aggregation,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<Filter>,
    #[serde(default, rename = "dateRange", skip_serializing_if = "Option::is_none")]
    pub date_range: Option<String>,
}

impl ChartSpec {
    pub fn new(id: impl Into<String>, table: impl Into<String>, aggregation: Aggregation) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            chart_type: ChartType::default(),
            table: table.into(),
            columns: ChartColumns::default(),
            aggregation,
            filters: Vec::new(),
            date_range: None,
        }
    }

    pub fn with_type(mut self, chart_type: ChartType) -> Self {
        self.chart_type = chart_type;
        self
    }

    pub fn with_x(mut self, column: impl Into<String>) -> Self {
        self.columns.x = Some(column.into());
        self
    }

    pub fn with_y(mut self, column: impl Into<String>) -> Self {
        self.columns.y = Some(column.into());
        self
    }

    pub fn with_group_by(mut self, column: impl Into<String>) -> Self {
        self.columns.group_by = Some(column.into());
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }
}

/// Declarative KPI definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiSpec {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub table: String,
    #[serde(default)]
    pub column: String,
    #[serde(default)]
    pub aggregation: Aggregation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, rename = "compareWith", skip_serializing_if = "Option::is_none")]
    pub compare_with: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<Filter>,
}

impl KpiSpec {
    pub fn new(
        id: impl Into<String>,
        table: impl Into<String>,
        column: impl Into<String>,
        aggregation: Aggregation,
    ) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            table: table.into(),
            column: column.into(),
            aggregation,
            icon: None,
            compare_with: None,
            filters: Vec::new(),
        }
    }

    pub fn comparing_previous_period(mut self) -> Self {
        self.compare_with = Some(PREVIOUS_PERIOD_TAG.to_string());
        self
    }

    pub fn compares_previous_period(&self) -> bool {
        self.compare_with.as_deref() == Some(PREVIOUS_PERIOD_TAG)
    }
}

/// The set of charts and KPIs shown on a source's dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub charts: Vec<ChartSpec>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub kpis: Vec<KpiSpec>,
}

impl DashboardConfig {
    /// Assigns ids to charts and KPIs that lack one (or repeat one already
    /// used) so every item has a unique cache key. Explicit ids are claimed
    /// before any id is generated.
    pub fn normalize(mut self) -> Self {
        let mut seen = HashSet::new();
        let chart_kept: Vec<bool> =
            self.charts.iter().map(|chart| claim_explicit(&chart.id, &mut seen)).collect();
        let kpi_kept: Vec<bool> =
            self.kpis.iter().map(|kpi| claim_explicit(&kpi.id, &mut seen)).collect();

        let mut next = 1usize;
        for (chart, kept) in self.charts.iter_mut().zip(chart_kept) {
            chart.id = if kept {
                chart.id.trim().to_string()
            } else {
                generate_id("chart", &mut seen, &mut next)
            };
        }
        next = 1;
        for (kpi, kept) in self.kpis.iter_mut().zip(kpi_kept) {
            kpi.id = if kept {
                kpi.id.trim().to_string()
            } else {
                generate_id("kpi", &mut seen, &mut next)
            };
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.charts.is_empty() && self.kpis.is_empty()
    }
}

/// Reserves a non-empty id on its first occurrence.
fn claim_explicit(id: &str, seen: &mut HashSet<String>) -> bool {
    let id = id.trim();
    !id.is_empty() && seen.insert(id.to_string())
}

fn generate_id(prefix: &str, seen: &mut HashSet<String>, next: &mut usize) -> String {
    loop {
        let candidate = format!("{prefix}_{next}");
        *next += 1;
        if seen.insert(candidate.clone()) {
            return candidate;
        }
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Kind of cached dashboard item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Chart,
    Kpi,
}

impl_domain_status_conversions!(ItemKind {
    Chart => "chart",
    Kpi => "kpi",
});

/// A spec as stored next to its cached result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "spec", rename_all = "lowercase")]
pub enum DashboardItem {
    Chart(ChartSpec),
    Kpi(KpiSpec),
}

impl DashboardItem {
    pub fn id(&self) -> &str {
        match self {
            Self::Chart(spec) => &spec.id,
            Self::Kpi(spec) => &spec.id,
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            Self::Chart(_) => ItemKind::Chart,
            Self::Kpi(_) => ItemKind::Kpi,
        }
    }

    pub fn table(&self) -> &str {
        match self {
            Self::Chart(spec) => &spec.table,
            Self::Kpi(spec) => &spec.table,
        }
    }
}
