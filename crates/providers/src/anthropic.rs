//! Anthropic native model client.
//!
//! Uses Anthropic's Messages API directly.
//!
//! Features:
//! - `x-api-key` header authentication (not Bearer)
//! - `anthropic-version` header
//! - System prompt as a top-level text block array
//! - Prompt-cache markers on the system prompt and the final tool schema
//! - Native tool use with `tool_use` / `tool_result` content blocks

use async_trait::async_trait;
use grantscout_config::ModelConfig;
use grantscout_core::error::ModelError;
use grantscout_core::message::{ContentBlock, ConversationMessage};
use grantscout_core::model::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// Anthropic Messages API client.
pub struct AnthropicClient {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicClient {
    /// Create a new client with the given request timeout.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ModelError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: "anthropic".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Build from `[model]` config. Fails when no API key is available.
    pub fn from_config(config: &ModelConfig) -> Result<Self, ModelError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                ModelError::NotConfigured(
                    "no API key (set model.api_key or ANTHROPIC_API_KEY)".into(),
                )
            })?;
        Ok(Self::new(api_key, Duration::from_secs(config.request_timeout_secs))?
            .with_base_url(&config.api_url))
    }

    /// Use a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Build the JSON request body, placing cache markers per the request's policy.
    fn build_body(request: &ModelRequest) -> serde_json::Value {
        let system = vec![SystemBlock {
            kind: "text",
            text: request.system.clone(),
            cache_control: request.cache.system.then(CacheControl::ephemeral),
        }];

        let tool_count = request.tools.len();
        let tools: Vec<AnthropicTool<'_>> = request
            .tools
            .iter()
            .enumerate()
            .map(|(i, t)| AnthropicTool {
                name: &t.name,
                description: &t.description,
                input_schema: &t.input_schema,
                cache_control: (request.cache.tools && i + 1 == tool_count)
                    .then(CacheControl::ephemeral),
            })
            .collect();

        let body = AnthropicRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: if request.system.is_empty() { None } else { Some(system) },
            tools,
            messages: &request.messages,
        };

        serde_json::to_value(&body).unwrap_or_default()
    }

    /// Map a non-success status to the model error taxonomy.
    fn status_error(status: u16, retry_after: Option<u64>, body: String) -> ModelError {
        match status {
            401 | 403 => ModelError::AuthenticationFailed("Invalid Anthropic API key".into()),
            429 => ModelError::RateLimited {
                retry_after_secs: retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
            },
            _ => ModelError::ApiError {
                status_code: status,
                message: body,
            },
        }
    }

    /// Convert a decoded response into core types. Unknown block kinds are dropped.
    fn to_model_response(resp: AnthropicResponse) -> ModelResponse {
        let content = resp
            .content
            .into_iter()
            .filter_map(|block| match block {
                ResponseContentBlock::Text { text } => Some(ContentBlock::Text { text }),
                ResponseContentBlock::ToolUse { id, name, input } => {
                    Some(ContentBlock::ToolUse { id, name, input })
                }
                ResponseContentBlock::Other => None,
            })
            .collect();

        ModelResponse {
            content,
            stop_reason: StopReason::from_api(resp.stop_reason.as_deref()),
            usage: TokenUsage {
                input_tokens: resp.usage.input_tokens,
                output_tokens: resp.usage.output_tokens,
                cache_read_tokens: resp.usage.cache_read_input_tokens.unwrap_or(0),
                cache_write_tokens: resp.usage.cache_creation_input_tokens.unwrap_or(0),
            },
            model: resp.model,
        }
    }
}

#[async_trait]
impl ModelClient for AnthropicClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ModelRequest,
    ) -> std::result::Result<ModelResponse, ModelError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = Self::build_body(&request);

        debug!(
            provider = "anthropic",
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout(e.to_string())
                } else {
                    ModelError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Anthropic API error");
            return Err(Self::status_error(status, retry_after, error_body));
        }

        let api_resp: AnthropicResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ModelError::Timeout(e.to_string())
            } else {
                ModelError::InvalidResponse(format!("Failed to parse Anthropic response: {e}"))
            }
        })?;

        Ok(Self::to_model_response(api_resp))
    }
}

// --- Anthropic API types ---

#[derive(Debug, Serialize)]
struct CacheControl {
    #[serde(rename = "type")]
    kind: &'static str,
}

impl CacheControl {
    fn ephemeral() -> Self {
        Self { kind: "ephemeral" }
    }
}

#[derive(Debug, Serialize)]
struct SystemBlock {
    #[serde(rename = "type")]
    kind: &'static str,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_control: Option<CacheControl>,
}

#[derive(Debug, Serialize)]
struct AnthropicTool<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: &'a serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_control: Option<CacheControl>,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<Vec<SystemBlock>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<AnthropicTool<'a>>,
    messages: &'a [ConversationMessage],
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    model: String,
    content: Vec<ResponseContentBlock>,
    usage: AnthropicUsage,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ResponseContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    /// thinking, redacted_thinking, server tool blocks
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
    #[serde(default)]
    cache_read_input_tokens: Option<u32>,
    #[serde(default)]
    cache_creation_input_tokens: Option<u32>,
}
