//! Aggregate accumulation, grouping and rounding

use std::cmp::Ordering;
use std::collections::BTreeMap;

use dashsync_domain::{Aggregation, ChartPoint, DocValue};

/// Running aggregate for one group.
///
/// `count` counts rows. `sum` adds the numeric cast of each value with
/// failed casts contributing 0. `avg`, `min` and `max` skip failed casts and
/// report 0 when nothing numeric was seen.
#[derive(Debug, Clone, Copy)]
pub struct Accumulator {
    aggregation: Aggregation,
    rows: u64,
    numeric: u64,
    sum: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl Accumulator {
    pub fn new(aggregation: Aggregation) -> Self {
        Self { aggregation, rows: 0, numeric: 0, sum: 0.0, min: None, max: None }
    }

    /// Add one row's value for the aggregated column.
    pub fn push(&mut self, value: Option<&DocValue>) {
        self.rows += 1;
        if let Some(number) = value.and_then(DocValue::as_f64) {
            self.numeric += 1;
            self.sum += number;
            self.min = Some(self.min.map_or(number, |current| current.min(number)));
            self.max = Some(self.max.map_or(number, |current| current.max(number)));
        }
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn finish(&self) -> f64 {
        match self.aggregation {
            Aggregation::Count => self.rows as f64,
            Aggregation::Sum => self.sum,
            Aggregation::Avg if self.numeric == 0 => 0.0,
            Aggregation::Avg => self.sum / self.numeric as f64,
            Aggregation::Min => self.min.unwrap_or(0.0),
            Aggregation::Max => self.max.unwrap_or(0.0),
        }
    }
}

/// Groups keyed rows and aggregates each group. Keys are kept sorted.
#[derive(Debug, Clone)]
pub struct Grouper {
    aggregation: Aggregation,
    groups: BTreeMap<String, Accumulator>,
}

impl Grouper {
    pub fn new(aggregation: Aggregation) -> Self {
        Self { aggregation, groups: BTreeMap::new() }
    }

    pub fn push(&mut self, key: String, value: Option<&DocValue>) {
        let aggregation = self.aggregation;
        self.groups.entry(key).or_insert_with(|| Accumulator::new(aggregation)).push(value);
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Points ordered by key ascending, capped at `limit`.
    pub fn by_key(self, limit: usize) -> Vec<ChartPoint> {
        self.groups
            .into_iter()
            .take(limit)
            .map(|(key, acc)| ChartPoint::new(key, round2(acc.finish())))
            .collect()
    }

    /// Points ordered by value descending (ties by key ascending), capped at
    /// `limit`.
    pub fn by_value_desc(self, limit: usize) -> Vec<ChartPoint> {
        let mut points: Vec<ChartPoint> = self
            .groups
            .into_iter()
            .map(|(key, acc)| ChartPoint::new(key, round2(acc.finish())))
            .collect();
        // BTreeMap iteration already orders keys, so a stable sort keeps ties by key.
        points.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(Ordering::Equal));
        points.truncate(limit);
        points
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
