//! Replace-all sync from external sources into the row store

pub mod engine;
pub mod ports;

pub use engine::{original_id, SyncEngine};
