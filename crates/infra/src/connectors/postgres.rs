//! Native Postgres connector (tokio-postgres)
//!
//! Rows are read as `row_to_json(t)::text` so every column type arrives in the
//! same JSON shape the REST connector returns.

use std::time::Duration;

use async_trait::async_trait;
use dashsync_core::sources::descriptor::SqlDescriptor;
use dashsync_core::SourceConnector;
use dashsync_domain::{DashSyncError, Document, Result};
use postgres_native_tls::MakeTlsConnector;
use tokio_postgres::{Client, Config, NoTls};
use tracing::{debug, info, instrument, warn};

use crate::errors::InfraError;

pub struct PostgresConnector {
    client: Client,
    database: String,
}

impl PostgresConnector {
    /// Open a connection. The connection task runs on the tokio runtime until
    /// the connector is dropped.
    #[instrument(skip_all, fields(host = %descriptor.host, database = %descriptor.database))]
    pub async fn connect(descriptor: &SqlDescriptor, timeout: Duration) -> Result<Self> {
        let mut config = Config::new();
        config
            .host(&descriptor.host)
            .port(descriptor.port)
            .user(&descriptor.user)
            .dbname(&descriptor.database)
            .application_name("dashsync")
            .connect_timeout(timeout);
        if let Some(password) = &descriptor.password {
            config.password(password);
        }

        let ssl_mode = descriptor.param("sslmode").unwrap_or("prefer");
        let client = if requires_tls(ssl_mode) {
            let mut builder = native_tls::TlsConnector::builder();
            match ssl_mode {
                "require" => {
                    builder.danger_accept_invalid_certs(true);
                }
                "verify-ca" => {
                    builder.danger_accept_invalid_hostnames(true);
                }
                _ => {}
            }
            let tls = builder.build().map_err(|e| {
                DashSyncError::Connection(format!("failed to build TLS connector: {e}"))
            })?;
            let (client, connection) =
                config.connect(MakeTlsConnector::new(tls)).await.map_err(pg_error)?;
            tokio::spawn(async move {
                if let Err(err) = connection.await {
                    warn!(error = %err, "postgres connection closed with error");
                }
            });
            client
        } else {
            let (client, connection) = config.connect(NoTls).await.map_err(pg_error)?;
            tokio::spawn(async move {
                if let Err(err) = connection.await {
                    warn!(error = %err, "postgres connection closed with error");
                }
            });
            client
        };

        info!(ssl_mode, "postgres connection established");
        Ok(Self { client, database: descriptor.database.clone() })
    }
}

#[async_trait]
impl SourceConnector for PostgresConnector {
    async fn test(&self) -> Result<()> {
        self.client.query_one("SELECT 1", &[]).await.map_err(pg_error)?;
        Ok(())
    }

    #[instrument(skip(self), fields(database = %self.database))]
    async fn fetch_all(&self, table: &str, limit: Option<usize>) -> Result<Vec<Document>> {
        let sql = select_sql(table, limit)?;
        let rows = self.client.query(sql.as_str(), &[]).await.map_err(pg_error)?;

        let documents = rows
            .iter()
            .map(|row| {
                let raw: String = row.try_get(0).map_err(pg_error)?;
                let value = serde_json::from_str(&raw).map_err(|e| {
                    DashSyncError::InvalidInput(format!("invalid row JSON from {table}: {e}"))
                })?;
                Document::from_json(value)
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(table, rows = documents.len(), "fetched table from postgres");
        Ok(documents)
    }
}

fn requires_tls(ssl_mode: &str) -> bool {
    matches!(ssl_mode, "require" | "verify-ca" | "verify-full")
}

fn pg_error(err: tokio_postgres::Error) -> DashSyncError {
    DashSyncError::from(InfraError::from(err))
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// `schema.table` names are split once on the first dot.
fn select_sql(table: &str, limit: Option<usize>) -> Result<String> {
    let table = table.trim();
    if table.is_empty() {
        return Err(DashSyncError::InvalidInput("table name is required".into()));
    }
    let relation = match table.split_once('.') {
        Some((schema, name)) => format!("{}.{}", quote_ident(schema), quote_ident(name)),
        None => quote_ident(table),
    };

    let mut sql = format!("SELECT row_to_json(t)::text FROM {relation} t");
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }
    Ok(sql)
}
