//! Aggregation engine: turns chart/KPI specifications into normalized results
//! over synced documents.

pub mod dates;
pub mod engine;
pub mod grouping;

pub use engine::{AggregationEngine, ChartMode};
