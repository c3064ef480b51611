//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `DASHSYNC_DB_PATH` is missing, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//! 5. Generator credentials always come from the environment
//!
//! ## Environment Variables
//! - `DASHSYNC_DB_PATH`: Local database file path (required for env loading)
//! - `DASHSYNC_DB_POOL_SIZE`: Connection pool size
//! - `DASHSYNC_DB_BUSY_TIMEOUT_MS`: SQLite busy timeout
//! - `DASHSYNC_SYNC_BATCH_SIZE`: Rows per insert batch
//! - `DASHSYNC_SYNC_FETCH_LIMIT`: Optional cap on rows fetched per table
//! - `DASHSYNC_SYNC_TIMEOUT_SECS`: Timeout for source requests
//! - `AI_API_KEY`, `OPENAI_API_KEY`, `OPENROUTER_API_KEY`: generator key, in
//!   that priority order
//! - `AI_BASE_URL`, `AI_MODEL`: generator endpoint and model
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./dashsync.json` or `./dashsync.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. `../../config.json` or `../../config.toml` (grandparent directory)
//! 5. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use dashsync_domain::{
    AiConfig, Config, DashSyncError, DatabaseConfig, Result, SyncConfig, DEFAULT_AI_MODEL,
    DEFAULT_OPENROUTER_MODEL, OPENAI_BASE_URL, OPENROUTER_BASE_URL,
};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If the database path
/// is not set there, falls back to loading from a config file. In both cases
/// the generator settings are resolved from the environment afterwards.
///
/// # Errors
/// Returns `DashSyncError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - A numeric variable cannot be parsed
pub fn load() -> Result<Config> {
    let mut config = match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            config
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)?
        }
    };

    config.ai = resolve_ai_config(config.ai);
    tracing::debug!(
        ai_base_url = %config.ai.base_url,
        ai_model = %config.ai.model,
        ai_key_present = config.ai.api_key.is_some(),
        "generator settings resolved"
    );
    Ok(config)
}

/// Load configuration from environment variables
///
/// Only `DASHSYNC_DB_PATH` is required; every other setting falls back to its
/// default when unset.
///
/// # Errors
/// Returns `DashSyncError::Config` if the path is missing or a numeric
/// variable has an invalid value.
pub fn load_from_env() -> Result<Config> {
    let db_defaults = DatabaseConfig::default();
    let sync_defaults = SyncConfig::default();

    let database = DatabaseConfig {
        path: env_var("DASHSYNC_DB_PATH")?,
        pool_size: env_parse("DASHSYNC_DB_POOL_SIZE")?.unwrap_or(db_defaults.pool_size),
        busy_timeout_ms: env_parse("DASHSYNC_DB_BUSY_TIMEOUT_MS")?
            .unwrap_or(db_defaults.busy_timeout_ms),
    };

    let sync = SyncConfig {
        batch_size: env_parse("DASHSYNC_SYNC_BATCH_SIZE")?.unwrap_or(sync_defaults.batch_size),
        fetch_limit: env_parse("DASHSYNC_SYNC_FETCH_LIMIT")?,
        request_timeout_secs: env_parse("DASHSYNC_SYNC_TIMEOUT_SECS")?
            .unwrap_or(sync_defaults.request_timeout_secs),
        max_attempts: sync_defaults.max_attempts,
    };

    Ok(Config { database, sync, ai: AiConfig::default() })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `DashSyncError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(DashSyncError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            DashSyncError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| DashSyncError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Resolve generator settings from the environment on top of `base`.
///
/// Key priority is `AI_API_KEY`, then `OPENAI_API_KEY`, then
/// `OPENROUTER_API_KEY`. An OpenRouter key without an explicit base URL
/// switches the default endpoint and model to OpenRouter's.
pub fn resolve_ai_config(base: AiConfig) -> AiConfig {
    let explicit_url = env_opt("AI_BASE_URL");
    let explicit_model = env_opt("AI_MODEL");
    let mut ai = base;

    if let Some(key) = env_opt("AI_API_KEY").or_else(|| env_opt("OPENAI_API_KEY")) {
        ai.api_key = Some(key);
    } else if let Some(key) = env_opt("OPENROUTER_API_KEY") {
        ai.api_key = Some(key);
        if explicit_url.is_none() && ai.base_url == OPENAI_BASE_URL {
            ai.base_url = OPENROUTER_BASE_URL.to_string();
            if explicit_model.is_none() && ai.model == DEFAULT_AI_MODEL {
                ai.model = DEFAULT_OPENROUTER_MODEL.to_string();
            }
        }
    }

    if let Some(url) = explicit_url {
        ai.base_url = url;
    }
    if let Some(model) = explicit_model {
        ai.model = model;
    }
    ai.base_url = ai.base_url.trim_end_matches('/').to_string();
    ai
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| DashSyncError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| DashSyncError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(DashSyncError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches for config files in the following locations (in order):
/// 1. Current working directory (`./config.{json,toml}`,
///    `./dashsync.{json,toml}`)
/// 2. Parent directories (up to 2 levels)
/// 3. Relative to executable location
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidate_files(&cwd));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidate_files(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn candidate_files(dir: &Path) -> Vec<PathBuf> {
    vec![
        dir.join("config.json"),
        dir.join("config.toml"),
        dir.join("dashsync.json"),
        dir.join("dashsync.toml"),
        dir.join("../config.json"),
        dir.join("../config.toml"),
        dir.join("../../config.json"),
        dir.join("../../config.toml"),
    ]
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        DashSyncError::Config(format!("Missing required environment variable: {}", key))
    })
}

/// Non-empty environment variable, trimmed
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|value| value.trim().to_string()).filter(|v| !v.is_empty())
}

/// Parse an optional environment variable
///
/// # Errors
/// Returns `DashSyncError::Config` when the variable is set but cannot be
/// parsed.
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_opt(key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| DashSyncError::Config(format!("Invalid value for {key}: {e}")))
        })
        .transpose()
}
