/// OpenAI-compatible client that proposes dashboard configurations
use async_trait::async_trait;
use dashsync_core::ConfigGenerator;
use dashsync_domain::constants::GENERATOR_SAMPLE_ROWS;
use dashsync_domain::{AiConfig, DashSyncError, DiscoveredTable, GeneratedConfig};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::http::HttpClient;

use super::types::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, DashboardProposal, OpenAIError,
};

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MAX_TOKENS: u32 = 2_000;
const DEFAULT_TEMPERATURE: f32 = 0.7;

const SYSTEM_PROMPT: &str = r#"You are a data analytics expert. Your task is to analyze database tables and recommend the best charts and KPIs for a dashboard.

You MUST respond with ONLY valid JSON in the exact format specified. No markdown, no explanations outside the JSON.

The JSON format must be:
{
  "charts": [
    {
      "id": "unique-id",
      "title": "Chart Title",
      "type": "line" | "bar" | "pie" | "area" | "stat",
      "table": "table_name",
      "columns": {
        "x": "column_for_x_axis_or_category",
        "y": "column_for_y_axis_or_value",
        "groupBy": "optional_column_to_group_by"
      },
      "aggregation": "count" | "sum" | "avg" | "min" | "max",
      "dateRange": "14d"
    }
  ],
  "kpis": [
    {
      "id": "unique-id",
      "title": "KPI Title",
      "table": "table_name",
      "column": "column_name",
      "aggregation": "count" | "sum" | "avg",
      "icon": "users" | "dollar-sign" | "package" | "activity" | "trending-up" | "wallet" | "check-circle" | "clock"
    }
  ],
  "reasoning": "Brief explanation of why these charts and KPIs were chosen"
}

Guidelines:
1. Create 4-6 meaningful charts that show trends, distributions, or comparisons
2. Create 3-4 KPIs showing key metrics
3. For time-series data (dates), prefer line or area charts
4. For categorical comparisons, prefer bar charts
5. For proportions/distributions, prefer pie charts
6. Use "stat" type for single value displays
7. Always use actual table and column names from the provided data
8. For date columns, use them as the x-axis with appropriate aggregation"#;

/// Chat-completions client for dashboard generation
pub struct OpenAIClient {
    http_client: HttpClient,
    api_key: String,
    model: String,
    api_url: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAIClient {
    /// Create a client against the default endpoint and model.
    pub fn new(api_key: String, http_client: HttpClient) -> Self {
        Self {
            http_client,
            api_key,
            model: DEFAULT_MODEL.to_string(),
            api_url: completions_url(DEFAULT_BASE_URL),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Build a client from loaded settings.
    ///
    /// # Errors
    /// Returns `DashSyncError::Config` when no API key is configured.
    pub fn from_config(config: &AiConfig, http_client: HttpClient) -> Result<Self, DashSyncError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                DashSyncError::Config("AI API key not configured; set AI_API_KEY".into())
            })?;

        Ok(Self {
            http_client,
            api_key: api_key.to_string(),
            model: config.model.clone(),
            api_url: completions_url(&config.base_url),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Ask the model for a dashboard over the discovered tables.
    #[instrument(skip_all, fields(model = %self.model, tables = tables.len()))]
    pub async fn propose_dashboard(
        &self,
        tables: &[DiscoveredTable],
    ) -> Result<GeneratedConfig, OpenAIError> {
        for table in tables {
            debug!(
                table = %table.table_name,
                rows = table.row_count,
                columns = table.columns.len(),
                "describing table for generation"
            );
        }

        let content = self.call_api(build_user_prompt(tables)).await?;
        let proposal: DashboardProposal =
            serde_json::from_str(strip_code_fences(&content)).map_err(|e| {
                OpenAIError::InvalidSchema(format!("failed to parse dashboard JSON: {e}"))
            })?;

        let config = proposal.config.normalize();
        info!(charts = config.charts.len(), kpis = config.kpis.len(), "dashboard proposal parsed");

        Ok(GeneratedConfig { config, reasoning: proposal.reasoning, model: self.model.clone() })
    }

    /// Call the Chat Completions API and return the first message content.
    async fn call_api(&self, prompt: String) -> Result<String, OpenAIError> {
        let request_payload = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let request_builder = self
            .http_client
            .request(Method::POST, &self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request_payload);

        let response = self.http_client.send(request_builder).await.map_err(|err| match err {
            DashSyncError::Network(msg) | DashSyncError::Internal(msg) => {
                OpenAIError::Network(msg)
            }
            other => OpenAIError::Network(format!("HTTP error: {other}")),
        })?;

        let status = response.status();
        debug!(status = status.as_u16(), "received completion response");

        if !status.is_success() {
            return Err(handle_error_status(status.as_u16(), response).await);
        }

        let chat_response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| OpenAIError::InvalidSchema(format!("failed to parse response: {e}")))?;

        if let Some(usage) = &chat_response.usage {
            debug!(tokens = usage.total_tokens, "completion token usage");
        }

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| OpenAIError::InvalidSchema("no response from AI".to_string()))
    }
}

#[async_trait]
impl ConfigGenerator for OpenAIClient {
    async fn generate(
        &self,
        tables: &[DiscoveredTable],
    ) -> dashsync_domain::Result<GeneratedConfig> {
        if tables.is_empty() {
            return Err(DashSyncError::InvalidInput(
                "at least one table is required to generate a dashboard".into(),
            ));
        }
        self.propose_dashboard(tables).await.map_err(|err| {
            warn!(error = %err, "dashboard generation failed");
            DashSyncError::from(err)
        })
    }
}

impl From<OpenAIError> for DashSyncError {
    fn from(err: OpenAIError) -> Self {
        match err {
            OpenAIError::Authentication(msg) => DashSyncError::Auth(msg),
            OpenAIError::RateLimit(_) | OpenAIError::Network(_) => {
                DashSyncError::Network(err.to_string())
            }
            OpenAIError::Api { status, .. } if status >= 500 => {
                DashSyncError::Network(err.to_string())
            }
            OpenAIError::Api { .. } | OpenAIError::InvalidSchema(_) => {
                DashSyncError::InvalidInput(err.to_string())
            }
        }
    }
}

/// Handle HTTP error status codes
async fn handle_error_status(status: u16, response: reqwest::Response) -> OpenAIError {
    let message = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());

    match status {
        401 | 403 => OpenAIError::Authentication(format!("Invalid API key ({status})")),
        429 => {
            // Default to 60s
            let retry_after = 60;
            OpenAIError::RateLimit(retry_after)
        }
        _ => OpenAIError::Api { status, message },
    }
}

fn completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

/// Models occasionally wrap JSON in a markdown block despite instructions.
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn build_user_prompt(tables: &[DiscoveredTable]) -> String {
    let descriptions: Vec<String> = tables.iter().map(describe_table).collect();

    format!(
        "Analyze these database tables and create a dashboard configuration:\n\n{}\n\n\
         Create appropriate charts and KPIs based on this data. Focus on:\n\
         - User/growth metrics if user data exists\n\
         - Transaction/financial metrics if transaction/wallet data exists\n\
         - Activity/engagement metrics if task/activity data exists\n\
         - Any other relevant business metrics\n\n\
         Remember: Respond ONLY with valid JSON, no other text.",
        descriptions.join("\n\n")
    )
}

fn describe_table(table: &DiscoveredTable) -> String {
    let columns: Vec<String> = table
        .columns
        .iter()
        .map(|column| format!("  - {} ({})", column.name, column.column_type))
        .collect();

    let mut description = format!(
        "Table: {} ({} rows)\nColumns:\n{}",
        table.table_name,
        table.row_count,
        columns.join("\n")
    );

    if !table.sample_rows.is_empty() {
        let samples: Vec<Value> = table
            .sample_rows
            .iter()
            .take(GENERATOR_SAMPLE_ROWS)
            .cloned()
            .map(Value::from)
            .collect();
        let rendered = serde_json::to_string_pretty(&samples).unwrap_or_default();
        description.push_str(&format!(
            "\n  Sample data ({} rows):\n  {}",
            table.sample_rows.len(),
            rendered.replace('\n', "\n  ")
        ));
    }

    description
}
