//! # DashSync App
//!
//! Application layer that wires the hexagonal architecture together.
//!
//! This crate contains:
//! - Application context (dependency injection, pool lifecycle)
//! - Logging initialisation and health reporting
//!
//! ## Architecture
//! - Depends on `domain`, `core`, and `infra`
//! - Every core port is bound to its infra adapter here and nowhere else

pub mod context;
pub mod utils;

pub use context::*;
