//! # DashSync Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - SQLite row store and repositories (rusqlite + r2d2)
//! - Source connectors (REST, PostgreSQL, MySQL, document-store stub)
//! - HTTP client with retries
//! - OpenAI-compatible dashboard configuration generator
//! - Configuration loading
//!
//! ## Architecture
//! - Implements traits defined in `dashsync-core`
//! - Depends on `dashsync-domain` and `dashsync-core`
//! - Contains all "impure" code (database, network, files)

pub mod config;
pub mod connectors;
pub mod database;
pub mod errors;
pub mod http;
pub mod integrations;

// Re-export commonly used items
pub use connectors::*;
pub use database::*;
pub use errors::InfraError;
pub use http::*;
pub use integrations::*;
