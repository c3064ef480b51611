//! MySQL connector (sqlx)
//!
//! Column names come from `information_schema`; each row is then rendered by
//! MySQL itself with `JSON_OBJECT` so typed values keep their JSON form.

use std::time::Duration;

use async_trait::async_trait;
use dashsync_core::sources::descriptor::SqlDescriptor;
use dashsync_core::SourceConnector;
use dashsync_domain::{DashSyncError, Document, Result};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlSslMode};
use tracing::{debug, info, instrument, warn};

use crate::errors::InfraError;

const MAX_CONNECTIONS: u32 = 2;

const COLUMNS_SQL: &str = "SELECT CAST(COLUMN_NAME AS CHAR)
    FROM information_schema.COLUMNS
    WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
    ORDER BY ORDINAL_POSITION";

pub struct MySqlConnector {
    pool: MySqlPool,
    database: String,
}

impl MySqlConnector {
    #[instrument(skip_all, fields(host = %descriptor.host, database = %descriptor.database))]
    pub async fn connect(descriptor: &SqlDescriptor, timeout: Duration) -> Result<Self> {
        let mut options = MySqlConnectOptions::new()
            .host(&descriptor.host)
            .port(descriptor.port)
            .username(&descriptor.user)
            .database(&descriptor.database);
        if let Some(password) = &descriptor.password {
            options = options.password(password);
        }
        if let Some(mode) = descriptor.param("ssl-mode").or_else(|| descriptor.param("sslmode")) {
            match mode.parse::<MySqlSslMode>() {
                Ok(mode) => options = options.ssl_mode(mode),
                Err(err) => warn!(mode, error = %err, "ignoring unknown mysql ssl mode"),
            }
        }

        let pool = MySqlPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(timeout)
            .connect_with(options)
            .await
            .map_err(sqlx_error)?;

        info!("mysql connection established");
        Ok(Self { pool, database: descriptor.database.clone() })
    }

    async fn columns(&self, table: &str) -> Result<Vec<String>> {
        let columns: Vec<String> = sqlx::query_scalar(COLUMNS_SQL)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(sqlx_error)?;
        if columns.is_empty() {
            return Err(DashSyncError::NotFound(format!(
                "table '{table}' not found in database '{}'",
                self.database
            )));
        }
        Ok(columns)
    }
}

#[async_trait]
impl SourceConnector for MySqlConnector {
    async fn test(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await.map_err(sqlx_error)?;
        Ok(())
    }

    #[instrument(skip(self), fields(database = %self.database))]
    async fn fetch_all(&self, table: &str, limit: Option<usize>) -> Result<Vec<Document>> {
        let table = table.trim();
        if table.is_empty() {
            return Err(DashSyncError::InvalidInput("table name is required".into()));
        }
        let columns = self.columns(table).await?;
        let sql = select_sql(table, &columns, limit);

        let mut query = sqlx::query_scalar::<_, String>(&sql);
        for column in &columns {
            query = query.bind(column);
        }
        let rows = query.fetch_all(&self.pool).await.map_err(sqlx_error)?;

        let documents = rows
            .iter()
            .map(|raw| {
                let value = serde_json::from_str(raw).map_err(|e| {
                    DashSyncError::InvalidInput(format!("invalid row JSON from {table}: {e}"))
                })?;
                Document::from_json(value)
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(table, rows = documents.len(), "fetched table from mysql");
        Ok(documents)
    }
}

fn sqlx_error(err: sqlx::Error) -> DashSyncError {
    DashSyncError::from(InfraError::from(err))
}

fn quote_ident(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

/// Keys are bound as parameters, one per column, in column order.
fn select_sql(table: &str, columns: &[String], limit: Option<usize>) -> String {
    let pairs: Vec<String> =
        columns.iter().map(|column| format!("?, {}", quote_ident(column))).collect();
    let mut sql = format!(
        "SELECT CAST(JSON_OBJECT({}) AS CHAR) FROM {}",
        pairs.join(", "),
        quote_ident(table)
    );
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }
    sql
}
