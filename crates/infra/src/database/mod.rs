//! Database implementations

mod helpers;
pub mod manager;
pub mod pool;
mod query;

pub mod cache_repository;
pub mod custom_chart_repository;
pub mod dashboard_config_repository;
pub mod row_store;
pub mod source_repository;
pub mod sync_job_repository;
pub mod synced_table_repository;

pub use cache_repository::*;
pub use custom_chart_repository::*;
pub use dashboard_config_repository::*;
pub use manager::*;
pub use pool::*;
pub use row_store::*;
pub use source_repository::*;
pub use sync_job_repository::*;
pub use synced_table_repository::*;
