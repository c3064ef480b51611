//! Shared helpers for app integration tests.

#![allow(dead_code)]

use dashsync_domain::{AiConfig, Config, DatabaseConfig, SyncConfig};
use once_cell::sync::Lazy;
use tempfile::TempDir;
use tokio::sync::Mutex;

/// Serialises tests that read or mutate process environment variables.
pub static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Configuration pointing at a database inside `temp_dir`.
pub fn test_config(temp_dir: &TempDir, ai_base_url: Option<String>) -> Config {
    let db_path = temp_dir.path().join("dashsync.db");
    let ai = match ai_base_url {
        Some(base_url) => AiConfig {
            api_key: Some("test-api-key".to_string()),
            base_url,
            ..AiConfig::default()
        },
        None => AiConfig { api_key: None, ..AiConfig::default() },
    };

    Config {
        database: DatabaseConfig {
            path: db_path.to_string_lossy().to_string(),
            pool_size: 4,
            ..DatabaseConfig::default()
        },
        sync: SyncConfig {
            batch_size: 2,
            request_timeout_secs: 5,
            max_attempts: 1,
            ..SyncConfig::default()
        },
        ai,
    }
}
