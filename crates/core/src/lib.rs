//! # DashSync Core
//!
//! Business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits) for storage, connectors and the
//!   configuration generator
//! - The sync engine, aggregation engine, result cache and dashboard
//!   orchestrator
//!
//! ## Architecture Principles
//! - Only depends on `dashsync-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits

pub mod aggregation;
pub mod cache;
pub mod dashboard;
pub mod sources;
pub mod sync;

pub use aggregation::AggregationEngine;
pub use cache::ports::{CacheRepository, CustomChartRepository};
pub use cache::CacheService;
pub use dashboard::ports::{ConfigGenerator, DashboardConfigRepository};
pub use dashboard::{CustomChartService, DashboardOrchestrator, DiscoveryService};
pub use sources::descriptor::ConnectionDescriptor;
pub use sources::ports::{
    ConnectorFactory, SourceConnector, SourceRepository, SyncedTableRepository,
};
pub use sources::SourceService;
pub use sync::ports::{RowQuery, RowStore, SyncJobRepository};
pub use sync::SyncEngine;
