//! Shared helpers for the SQLite repositories: error mapping, timestamp
//! conversion and text-column decoding.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use dashsync_domain::DashSyncError;
use rusqlite::types::Type;
use tokio::task::JoinError;
use tracing::warn;

use crate::errors::InfraError;

pub(crate) fn map_sql_error(err: rusqlite::Error) -> DashSyncError {
    DashSyncError::from(InfraError::from(err))
}

pub(crate) fn map_join_error(err: JoinError) -> DashSyncError {
    DashSyncError::from(InfraError::from(err))
}

pub(crate) fn map_json_error(context: &str, err: serde_json::Error) -> DashSyncError {
    DashSyncError::Database(format!("{context}: {err}"))
}

pub(crate) fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub(crate) fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

pub(crate) fn opt_from_millis(ms: Option<i64>) -> Option<DateTime<Utc>> {
    ms.map(from_millis)
}

/// Decode a JSON text column inside a row mapper.
pub(crate) fn json_column<T: serde::de::DeserializeOwned>(
    index: usize,
    raw: &str,
) -> rusqlite::Result<T> {
    serde_json::from_str(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
}

/// Parse an enum text column inside a row mapper. Unknown values are a
/// conversion failure.
pub(crate) fn enum_column<T>(index: usize, raw: &str) -> rusqlite::Result<T>
where
    T: FromStr<Err = String>,
{
    raw.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(
            index,
            Type::Text,
            Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
        )
    })
}

/// Parse a status-like text column. Unknown values fall back to `fallback`
/// with a warning so one bad row never hides the rest.
pub(crate) fn parse_status<T>(column: &str, raw: &str, fallback: T) -> T
where
    T: FromStr<Err = String> + Copy,
{
    match raw.parse() {
        Ok(value) => value,
        Err(err) => {
            warn!(column, value = raw, error = %err, "unknown status value in database");
            fallback
        }
    }
}

pub(crate) fn usize_to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use dashsync_domain::SyncStatus;

    use super::*;

    #[test]
    fn millis_conversion_keeps_sub_second_precision() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).single().expect("valid instant");
        assert_eq!(from_millis(to_millis(at)), at);
        assert_eq!(opt_from_millis(None), None);
    }

    #[test]
    fn unknown_status_falls_back() {
        assert_eq!(parse_status("sync_status", "ACTIVE", SyncStatus::Pending), SyncStatus::Active);
        assert_eq!(parse_status("sync_status", "paused", SyncStatus::Pending), SyncStatus::Pending);
    }
}
