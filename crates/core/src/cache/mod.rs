//! Computed-result cache keyed by (source, dashboard item)

pub mod ports;
pub mod service;

pub use service::CacheService;
