//! Connector factory: turns a registered source into an open connector.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashsync_core::{ConnectionDescriptor, ConnectorFactory, SourceConnector};
use dashsync_domain::{DashSyncError, ExternalSource, Result, SourceKind, SyncConfig};
use tracing::{debug, instrument};

use super::mongo::MongoConnector;
use super::mysql::MySqlConnector;
use super::postgres::PostgresConnector;
use super::rest::RestConnector;
use crate::http::HttpClient;

/// Opens connectors for every supported source family.
pub struct SourceConnectorFactory {
    http: HttpClient,
    timeout: Duration,
}

impl SourceConnectorFactory {
    pub fn new(config: &SyncConfig) -> Result<Self> {
        Ok(Self {
            http: HttpClient::for_sources(config)?,
            timeout: Duration::from_secs(config.request_timeout_secs.max(1)),
        })
    }

    /// Factory sharing an existing HTTP client for REST sources.
    pub fn with_http_client(http: HttpClient, timeout: Duration) -> Self {
        Self { http, timeout }
    }
}

#[async_trait]
impl ConnectorFactory for SourceConnectorFactory {
    #[instrument(skip(self, source), fields(source_id = %source.id, kind = %source.kind))]
    async fn connect(&self, source: &ExternalSource) -> Result<Arc<dyn SourceConnector>> {
        let descriptor = ConnectionDescriptor::parse_for(source.kind, &source.descriptor)?;
        debug!(%descriptor, "opening source connector");

        let connector: Arc<dyn SourceConnector> = match descriptor {
            ConnectionDescriptor::Rest { base_url, api_key } => {
                let connector = RestConnector::new(self.http.clone(), &base_url, api_key)?;
                connector
                    .ensure_reachable()
                    .await
                    .map_err(|err| as_connection_error(err, &source.name))?;
                Arc::new(connector)
            }
            ConnectionDescriptor::Sql(sql) => match sql.kind {
                SourceKind::Postgres => {
                    Arc::new(PostgresConnector::connect(&sql, self.timeout).await.map_err(
                        |err| as_connection_error(err, &source.name),
                    )?)
                }
                SourceKind::Mysql => {
                    Arc::new(MySqlConnector::connect(&sql, self.timeout).await.map_err(
                        |err| as_connection_error(err, &source.name),
                    )?)
                }
                SourceKind::Mongodb => {
                    return Err(DashSyncError::Connection(
                        "SQL descriptor cannot be used for a mongodb source".into(),
                    ))
                }
            },
            ConnectionDescriptor::Document { uri } => Arc::new(MongoConnector::new(&uri)?),
        };

        Ok(connector)
    }
}

/// Failing to open a connection is always reported as a connection error.
fn as_connection_error(err: DashSyncError, source_name: &str) -> DashSyncError {
    match err {
        DashSyncError::Connection(_) => err,
        other => DashSyncError::Connection(format!(
            "failed to connect to external database '{source_name}': {other}"
        )),
    }
}
