use std::str::FromStr;

use dashsync_domain::{DashSyncError, SyncSummary};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Environment variable selecting the log output format.
pub const LOG_FORMAT_ENV: &str = "DASHSYNC_LOG_FORMAT";

const DEFAULT_FILTER: &str = "info";

/// Output format for the global subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    /// Read the format from `DASHSYNC_LOG_FORMAT`, falling back to text.
    pub fn from_env() -> Self {
        std::env::var(LOG_FORMAT_ENV).ok().and_then(|raw| raw.parse().ok()).unwrap_or_default()
    }
}

impl FromStr for LogFormat {
    type Err = DashSyncError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(DashSyncError::Config(format!("unknown log format: {other}"))),
        }
    }
}

/// Install the global tracing subscriber.
///
/// The filter comes from `RUST_LOG` and defaults to `info`. Calling this more
/// than once is harmless: later calls leave the first subscriber in place and
/// return `false`.
pub fn init_tracing(format: LogFormat) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().with_current_span(false).try_init(),
    };

    installed.is_ok()
}

/// Log the outcome of a replace-all sync with structured fields.
///
/// Per-table failures are logged individually at `warn`.
pub fn log_sync_summary(summary: &SyncSummary) {
    info!(
        source_id = %summary.source_id,
        total_tables = summary.total_tables,
        success_count = summary.success_count,
        failed_count = summary.failed_count,
        total_rows = summary.total_rows,
        "sync_completed"
    );

    for table in summary.tables.iter().filter(|table| !table.success) {
        warn!(
            source_id = %summary.source_id,
            table = %table.table_name,
            error = table.error.as_deref().unwrap_or("unknown"),
            "table_sync_failed"
        );
    }
}
