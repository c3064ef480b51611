/// OpenAI-compatible dashboard generation
///
/// `OpenAIClient` sends discovered table metadata (columns, row counts and a
/// few sample rows) to a Chat Completions endpoint and parses the returned
/// `{charts, kpis, reasoning}` JSON into a normalized dashboard
/// configuration. Any OpenAI-compatible base URL works (OpenAI, OpenRouter,
/// self-hosted gateways).
///
/// # Usage
///
/// ```no_run
/// use dashsync_domain::AiConfig;
/// use dashsync_infra::http::HttpClient;
/// use dashsync_infra::integrations::openai::OpenAIClient;
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = AiConfig { api_key: Some("sk-...".into()), ..AiConfig::default() };
/// let client = OpenAIClient::from_config(&config, HttpClient::new()?)?;
/// let generated = client.propose_dashboard(&[]).await?;
/// println!("{} charts: {}", generated.config.charts.len(), generated.reasoning);
/// # Ok(())
/// # }
/// ```
///
/// # Error Handling
///
/// - **Network errors / 5xx**: retried by `HttpClient`, then `OpenAIError::Network`
/// - **401 / 403**: `OpenAIError::Authentication`
/// - **429**: `OpenAIError::RateLimit`
/// - **Unparseable content**: `OpenAIError::InvalidSchema`
pub mod client;
pub mod types;

pub use client::OpenAIClient;
pub use types::OpenAIError;
