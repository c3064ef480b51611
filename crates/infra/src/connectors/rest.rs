//! PostgREST-style HTTP connector
//!
//! Reads whole tables through `GET {base}/rest/v1/{table}?select=*` with the
//! project API key sent both as `apikey` and as a bearer token.

use async_trait::async_trait;
use dashsync_core::SourceConnector;
use dashsync_domain::{DashSyncError, Document, Result};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::http::HttpClient;

/// Error body returned by PostgREST.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

pub struct RestConnector {
    http: HttpClient,
    base_url: Url,
    api_key: String,
}

impl RestConnector {
    pub fn new(http: HttpClient, base_url: &str, api_key: impl Into<String>) -> Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/')).map_err(|e| {
            DashSyncError::Connection(format!("invalid REST base URL '{base_url}': {e}"))
        })?;
        Ok(Self { http, base_url, api_key: api_key.into() })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| DashSyncError::Connection("REST base URL cannot carry a path".into()))?
            .pop_if_empty()
            .extend(path.split('/'));
        Ok(url)
    }

    fn authorized(&self, url: Url) -> RequestBuilder {
        self.http
            .request(Method::GET, url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
    }

    /// Transport failures on a source request mean the source is unreachable.
    async fn send(&self, url: Url) -> Result<Response> {
        let base_url = &self.base_url;
        self.http.send(self.authorized(url)).await.map_err(|err| {
            DashSyncError::Connection(format!("REST source {base_url} is unreachable: {err}"))
        })
    }

    /// Cheap reachability check run when the connector is opened.
    ///
    /// Any HTTP answer counts as reachable except rejected credentials; the
    /// root listing is not exposed by every deployment.
    pub async fn ensure_reachable(&self) -> Result<()> {
        let response = self.send(self.endpoint("rest/v1/")?).await?;
        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ensure_success(response, "rest/v1").await.map(|_| ())
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl SourceConnector for RestConnector {
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn test(&self) -> Result<()> {
        let response = self.send(self.endpoint("rest/v1/")?).await?;
        ensure_success(response, "rest/v1").await?;
        debug!("REST endpoint reachable");
        Ok(())
    }

    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn fetch_all(&self, table: &str, limit: Option<usize>) -> Result<Vec<Document>> {
        let table = table.trim();
        if table.is_empty() {
            return Err(DashSyncError::InvalidInput("table name is required".into()));
        }

        let mut url = self.endpoint(&format!("rest/v1/{table}"))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("select", "*");
            if let Some(limit) = limit {
                query.append_pair("limit", &limit.to_string());
            }
        }

        let response = self.send(url).await?;
        let response = ensure_success(response, table).await?;
        let rows: Vec<Value> = HttpClient::read_json(response).await?;

        debug!(table, rows = rows.len(), "fetched table over REST");
        rows.into_iter().map(Document::from_json).collect()
    }
}

async fn ensure_success(response: Response, what: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            DashSyncError::Connection(format!("credentials rejected for {what}: {detail}"))
        }
        StatusCode::NOT_FOUND => DashSyncError::NotFound(format!("{what}: {detail}")),
        _ => DashSyncError::Network(format!(
            "failed to fetch data from {what}: HTTP {}: {detail}",
            status.as_u16()
        )),
    })
}
