//! Conversions from external infrastructure errors into domain errors.

use dashsync_domain::DashSyncError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;
use tokio::task::JoinError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub DashSyncError);

impl From<InfraError> for DashSyncError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<DashSyncError> for InfraError {
    fn from(value: DashSyncError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoDashSyncError {
    fn into_dashsync(self) -> DashSyncError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → DashSyncError */
/* -------------------------------------------------------------------------- */

impl IntoDashSyncError for SqlError {
    fn into_dashsync(self) -> DashSyncError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => {
                        DashSyncError::Database("database is busy".into())
                    }
                    (ErrorCode::DatabaseLocked, _) => {
                        DashSyncError::Database("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 2067) => {
                        DashSyncError::Database("unique constraint violation".into())
                    }
                    (ErrorCode::ConstraintViolation, 787) => {
                        DashSyncError::Database("foreign key constraint violation".into())
                    }
                    _ => DashSyncError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => DashSyncError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                DashSyncError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                DashSyncError::Database(format!("invalid column type: {ty}"))
            }
            RE::Utf8Error(_) => {
                DashSyncError::Database("invalid UTF-8 returned from sqlite".into())
            }
            RE::InvalidParameterName(parameter_name) => {
                DashSyncError::Database(format!("invalid parameter name: {parameter_name}"))
            }
            RE::InvalidPath(path) => DashSyncError::Database(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            RE::InvalidQuery => DashSyncError::Database("invalid SQL query".into()),
            other => DashSyncError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_dashsync())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → DashSyncError */
/* -------------------------------------------------------------------------- */

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(DashSyncError::Database(format!("connection pool error: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → DashSyncError */
/* -------------------------------------------------------------------------- */

impl IntoDashSyncError for HttpError {
    fn into_dashsync(self) -> DashSyncError {
        if self.is_timeout() {
            return DashSyncError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return DashSyncError::Connection("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => DashSyncError::Auth(message),
                404 => DashSyncError::NotFound(message),
                429 => DashSyncError::Network(message),
                400..=499 => DashSyncError::InvalidInput(message),
                _ => DashSyncError::Network(message),
            };
        }

        DashSyncError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_dashsync())
    }
}

/* -------------------------------------------------------------------------- */
/* tokio_postgres::Error → DashSyncError */
/* -------------------------------------------------------------------------- */

impl IntoDashSyncError for tokio_postgres::Error {
    fn into_dashsync(self) -> DashSyncError {
        use tokio_postgres::error::SqlState;

        if self.is_closed() {
            return DashSyncError::Connection("postgres connection closed".into());
        }

        match self.code() {
            Some(code)
                if *code == SqlState::INVALID_PASSWORD
                    || *code == SqlState::INVALID_AUTHORIZATION_SPECIFICATION =>
            {
                DashSyncError::Connection("postgres rejected the credentials".into())
            }
            Some(code) if *code == SqlState::UNDEFINED_TABLE => {
                let message = self.as_db_error().map(|db| db.message().to_string());
                DashSyncError::NotFound(message.unwrap_or_else(|| "relation not found".into()))
            }
            Some(_) => {
                let message =
                    self.as_db_error().map_or_else(|| self.to_string(), |db| db.message().into());
                DashSyncError::Network(format!("postgres query failed: {message}"))
            }
            None => DashSyncError::Connection(format!("postgres error: {self}")),
        }
    }
}

impl From<tokio_postgres::Error> for InfraError {
    fn from(value: tokio_postgres::Error) -> Self {
        InfraError(value.into_dashsync())
    }
}

/* -------------------------------------------------------------------------- */
/* sqlx::Error → DashSyncError */
/* -------------------------------------------------------------------------- */

impl IntoDashSyncError for sqlx::Error {
    fn into_dashsync(self) -> DashSyncError {
        use sqlx::Error as SE;

        match self {
            SE::Database(db) => match db.code().as_deref() {
                // SQLSTATE: access denied / unknown table
                Some("28000") => {
                    DashSyncError::Connection("mysql rejected the credentials".into())
                }
                Some("42S02") => DashSyncError::NotFound(db.message().to_string()),
                _ => DashSyncError::Network(format!("mysql query failed: {}", db.message())),
            },
            SE::RowNotFound => DashSyncError::NotFound("no rows returned by query".into()),
            SE::Io(err) => DashSyncError::Connection(format!("mysql I/O error: {err}")),
            SE::Tls(err) => DashSyncError::Connection(format!("mysql TLS error: {err}")),
            SE::PoolTimedOut => DashSyncError::Connection("mysql connection timed out".into()),
            SE::Configuration(err) => {
                DashSyncError::Connection(format!("invalid mysql configuration: {err}"))
            }
            other => DashSyncError::Network(format!("mysql error: {other}")),
        }
    }
}

impl From<sqlx::Error> for InfraError {
    fn from(value: sqlx::Error) -> Self {
        InfraError(value.into_dashsync())
    }
}

/* -------------------------------------------------------------------------- */
/* tokio::task::JoinError → DashSyncError */
/* -------------------------------------------------------------------------- */

impl From<JoinError> for InfraError {
    fn from(value: JoinError) -> Self {
        InfraError(DashSyncError::Internal(format!("Task join error: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
