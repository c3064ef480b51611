//! Retrying HTTP client shared by REST sources and the config generator.
//!
//! Every request gets an attempt budget. Transport failures and 5xx answers
//! are retried with capped exponential backoff; a `Retry-After` header on a
//! 503 overrides the computed delay. Anything else goes straight back to the
//! caller so adapters can map status codes themselves.

use std::time::Duration;

use dashsync_domain::{DashSyncError, SyncConfig};
use reqwest::header::RETRY_AFTER;
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::errors::InfraError;

const USER_AGENT: &str = concat!("dashsync/", env!("CARGO_PKG_VERSION"));

/// Upper bound for a single backoff sleep, including server-provided hints.
const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Attempt budget and delay schedule.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_backoff: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based): base, 2x base, 4x base...
    pub fn delay_for(&self, retry: usize) -> Duration {
        let shift = retry.saturating_sub(1).min(8) as u32;
        self.base_backoff.saturating_mul(1 << shift).min(MAX_BACKOFF)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_backoff: Duration::from_millis(200) }
    }
}

enum Outcome {
    Done(Response),
    /// Transient failure; `hint` is the server's requested delay.
    Retry { hint: Option<Duration>, result: Result<Response, reqwest::Error> },
    Fail(reqwest::Error),
}

/// HTTP client with retry and timeout support.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    policy: RetryPolicy,
}

impl HttpClient {
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    pub fn new() -> Result<Self, DashSyncError> {
        Self::builder().build()
    }

    /// Client for external sources, using the sync timeout and attempt budget.
    pub fn for_sources(config: &SyncConfig) -> Result<Self, DashSyncError> {
        Self::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .max_attempts(config.max_attempts)
            .user_agent(USER_AGENT)
            .build()
    }

    /// Decode a response body as JSON. Decode failures name the URL path.
    pub async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, DashSyncError> {
        let url = response.url().clone();
        let body = response.bytes().await.map_err(transport_error)?;
        serde_json::from_slice(&body).map_err(|err| {
            DashSyncError::InvalidInput(format!("unexpected JSON from {}: {err}", url.path()))
        })
    }

    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Send a request, retrying within the attempt budget.
    ///
    /// The final 5xx response is returned as `Ok` so the caller sees the
    /// status; only transport failures become errors.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, DashSyncError> {
        let attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let request = builder
                .try_clone()
                .ok_or_else(|| {
                    DashSyncError::Internal("streaming request bodies cannot be retried".into())
                })?
                .build()
                .map_err(transport_error)?;
            let (method, url) = (request.method().clone(), request.url().clone());
            debug!(attempt, %method, %url, "sending HTTP request");

            match classify(self.client.execute(request).await) {
                Outcome::Done(response) => return Ok(response),
                Outcome::Fail(err) => return Err(transport_error(err)),
                Outcome::Retry { result, .. } if attempt >= attempts => {
                    return result.map_err(transport_error);
                }
                Outcome::Retry { hint, .. } => {
                    let delay = match hint {
                        Some(hint) => hint.min(MAX_BACKOFF),
                        None => self.policy.delay_for(attempt),
                    };
                    warn!(attempt, %method, %url, delay_ms = delay.as_millis() as u64, "retrying");
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }
}

fn classify(result: Result<Response, reqwest::Error>) -> Outcome {
    match result {
        Ok(response) if response.status().is_server_error() => {
            let hint = (response.status() == StatusCode::SERVICE_UNAVAILABLE)
                .then(|| retry_after(&response))
                .flatten();
            Outcome::Retry { hint, result: Ok(response) }
        }
        Ok(response) => Outcome::Done(response),
        Err(err) if err.is_timeout() || err.is_connect() || err.is_request() => {
            debug!(error = %err, "transient HTTP failure");
            Outcome::Retry { hint: None, result: Err(err) }
        }
        Err(err) => Outcome::Fail(err),
    }
}

/// `Retry-After` in delta-seconds form.
fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn transport_error(err: reqwest::Error) -> DashSyncError {
    DashSyncError::from(InfraError::from(err))
}

/// Builder for [`HttpClient`].
#[derive(Debug, Default)]
pub struct HttpClientBuilder {
    timeout: Option<Duration>,
    policy: RetryPolicy,
    user_agent: Option<String>,
    default_headers: Option<reqwest::header::HeaderMap>,
}

impl HttpClientBuilder {
    /// Per-request timeout. Defaults to 30 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Total attempts, initial try included. Zero is treated as one.
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.policy.max_attempts = attempts.max(1);
        self
    }

    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.policy.base_backoff = backoff;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn default_headers(mut self, headers: reqwest::header::HeaderMap) -> Self {
        self.default_headers = Some(headers);
        self
    }

    pub fn build(self) -> Result<HttpClient, DashSyncError> {
        let mut builder = ReqwestClient::builder()
            .timeout(self.timeout.unwrap_or(Duration::from_secs(30)))
            .no_proxy();
        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }
        if let Some(headers) = self.default_headers {
            builder = builder.default_headers(headers);
        }

        Ok(HttpClient { client: builder.build().map_err(transport_error)?, policy: self.policy })
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn fast_client(attempts: usize) -> HttpClient {
        HttpClient::builder()
            .base_backoff(Duration::from_millis(5))
            .max_attempts(attempts)
            .build()
            .expect("http client should build")
    }

    async fn get(client: &HttpClient, url: String) -> Result<Response, DashSyncError> {
        client.send(client.request(Method::GET, url)).await
    }

    #[test]
    fn backoff_doubles_and_is_capped() {
        let policy = RetryPolicy { max_attempts: 5, base_backoff: Duration::from_millis(100) };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for(30), MAX_BACKOFF);
    }

    #[tokio::test]
    async fn success_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let response = get(&fast_client(3), server.uri()).await.expect("response should arrive");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn server_errors_are_retried_until_success() {
        let server = MockServer::start().await;
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        Mock::given(method("GET"))
            .respond_with(move |_req: &wiremock::Request| -> ResponseTemplate {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    ResponseTemplate::new(502)
                } else {
                    ResponseTemplate::new(200)
                }
            })
            .mount(&server)
            .await;

        let response = get(&fast_client(3), server.uri()).await.expect("response should arrive");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_budget_returns_last_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).insert_header("Retry-After", "0"))
            .mount(&server)
            .await;

        let response = get(&fast_client(2), server.uri()).await.expect("response should arrive");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn client_errors_are_returned_immediately() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let response = get(&fast_client(3), server.uri()).await.expect("response should arrive");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn read_json_names_the_path_on_garbage() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{"id": 1}])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/bad"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let client = HttpClient::for_sources(&SyncConfig::default()).expect("client should build");
        let ok = get(&client, format!("{}/ok", server.uri())).await.expect("ok should respond");
        let rows: Vec<serde_json::Value> = HttpClient::read_json(ok).await.expect("rows");
        assert_eq!(rows.len(), 1);

        let bad = get(&client, format!("{}/bad", server.uri())).await.expect("bad should respond");
        let err = HttpClient::read_json::<Vec<serde_json::Value>>(bad)
            .await
            .expect_err("garbage should not decode");
        assert!(matches!(err, DashSyncError::InvalidInput(msg) if msg.contains("/bad")));
    }

    #[tokio::test]
    async fn refused_connection_becomes_connection_error() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("port should bind");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);

        let result = get(&fast_client(2), format!("http://{addr}")).await;
        assert!(matches!(result, Err(DashSyncError::Connection(_))), "got {result:?}");
    }
}
