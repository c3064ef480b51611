//! Domain types and models

pub mod custom;
pub mod dashboard;
pub mod discovery;
pub mod document;
pub mod results;
pub mod source;
pub mod sync;

pub use custom::{is_custom_item_id, CustomChartConfig, CustomChartEntry, CustomDataSource};
pub use dashboard::{
    matches_all, Aggregation, ChartColumns, ChartSpec, ChartType, DashboardConfig,
    DashboardItem, Filter, FilterOperator, ItemKind, KpiSpec,
};
pub use discovery::{DashboardConfigRecord, DiscoveredTable, GeneratedConfig};
pub use document::{parse_numeric, DocValue, Document};
pub use results::{
    CacheEntry, CachedDashboard, ChartData, ChartPoint, DateFormat, ItemResult, KpiValue,
    RefreshSummary, StalenessReport,
};
pub use source::{ColumnInfo, ExternalSource, SourceKind, SyncStatus, SyncedTable};
pub use sync::{
    NewRow, SyncJob, SyncJobStatus, SyncStatusReport, SyncSummary, SyncedRow, TableSyncResult,
};
