//! # DashSync Domain
//!
//! Business domain types and models for DashSync.
//!
//! This crate contains:
//! - Sources, synced tables and dynamic row documents
//! - Chart / KPI specifications, filters and computed results
//! - Domain error types and Result definitions
//! - Configuration structures and shared limits
//!
//! ## Architecture
//! - No dependencies on other DashSync crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
