//! Dashboard loading, discovery and user-defined charts

pub mod custom_charts;
pub mod discovery;
pub mod orchestrator;
pub mod ports;

pub use custom_charts::CustomChartService;
pub use discovery::DiscoveryService;
pub use orchestrator::{DashboardOrchestrator, LoadedDashboard};
