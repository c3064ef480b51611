//! Source registration and connector ports

pub mod descriptor;
pub mod ports;
pub mod service;

pub use service::SourceService;
