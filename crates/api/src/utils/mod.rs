//! Application utilities

pub mod health;
pub mod logging;

pub use logging::{init_tracing, LogFormat};
