//! SQLite connection pool
//!
//! r2d2 pool whose connections are prepared with the store's pragmas and the
//! `dash_number` SQL function before first use.

use std::path::Path;
use std::time::Duration;

use dashsync_domain::{parse_numeric, DashSyncError, DatabaseConfig, Result};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use tracing::{info, instrument, warn};

/// Pooled SQLite connection.
pub type SqlitePool = Pool<SqliteConnectionManager>;

/// Connection pool settings.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_size: u32,
    pub connection_timeout: Duration,
    pub busy_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 10,
            connection_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_millis(5_000),
        }
    }
}

impl From<&DatabaseConfig> for PoolConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            max_size: config.pool_size.max(1),
            busy_timeout: Duration::from_millis(config.busy_timeout_ms),
            ..Self::default()
        }
    }
}

/// Build the pool. r2d2 opens the initial connections eagerly, so open and
/// init errors surface here.
#[instrument(skip_all, fields(db_path = %path.display(), pool_size = config.max_size))]
pub fn create_pool(path: &Path, config: &PoolConfig) -> Result<SqlitePool> {
    let busy_timeout = config.busy_timeout;
    let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
        apply_connection_pragmas(conn, busy_timeout)?;
        register_functions(conn)
    });

    let pool = Pool::builder()
        .max_size(config.max_size)
        .connection_timeout(config.connection_timeout)
        .build(manager)
        .map_err(|e| {
            warn!(error = %e, "failed to create connection pool");
            DashSyncError::Database(format!("Failed to create pool: {e}"))
        })?;

    info!("sqlite pool created");
    Ok(pool)
}

/// Apply connection-level pragmas
///
/// - WAL mode so readers never block on a sync in progress
/// - NORMAL synchronous mode
/// - WAL autocheckpoint after 1000 pages
/// - Foreign key constraints enabled (cascading deletes)
/// - Busy timeout for lock contention
pub fn apply_connection_pragmas(
    conn: &Connection,
    busy_timeout: Duration,
) -> rusqlite::Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA wal_autocheckpoint=1000;
         PRAGMA synchronous=NORMAL;
         PRAGMA foreign_keys=ON;",
    )?;
    conn.busy_timeout(busy_timeout)
}

/// Register `dash_number(value)`: numbers pass through, text is parsed after
/// trimming, everything else yields NULL.
pub fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "dash_number",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let number = match ctx.get_raw(0) {
                ValueRef::Integer(value) => Some(value as f64),
                ValueRef::Real(value) => value.is_finite().then_some(value),
                ValueRef::Text(bytes) => std::str::from_utf8(bytes).ok().and_then(parse_numeric),
                ValueRef::Null | ValueRef::Blob(_) => None,
            };
            Ok(number)
        },
    )
}
