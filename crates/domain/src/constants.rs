//! Application constants
//!
//! Centralized location for the domain-level limits shared by the sync,
//! aggregation and cache layers.

// Sync
pub const DEFAULT_SYNC_BATCH_SIZE: usize = 1000;
pub const RECENT_SYNC_JOBS_LIMIT: usize = 10;

// Aggregation limits
pub const MAX_GROUPS: usize = 20;
pub const MAX_SERIES_POINTS: usize = 60;
pub const MAX_CUSTOM_CHART_GROUPS: usize = 100;
pub const UNKNOWN_GROUP_KEY: &str = "Unknown";
pub const RAW_DATE_PREFIX_LEN: usize = 10;

/// Column-name fragments that mark an x column as a date column. Matched
/// case-insensitively as substrings.
pub const DATE_COLUMN_KEYWORDS: &[&str] =
    &["created_at", "updated_at", "date", "timestamp", "time", "created", "updated", "modified"];

// KPI growth windows (days, relative to now, over synced_at)
pub const GROWTH_WINDOW_DAYS: i64 = 30;
pub const PREVIOUS_PERIOD_TAG: &str = "previous_period";

// Cache
pub const CUSTOM_ITEM_PREFIX: &str = "custom_";

// Discovery
pub const DISCOVERY_SAMPLE_ROWS: usize = 5;
pub const GENERATOR_SAMPLE_ROWS: usize = 3;
