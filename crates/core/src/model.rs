//! ModelClient trait: the abstraction over text-generation backends.
//!
//! A client takes a system prompt, tool schemas, and the message history,
//! performs exactly one generation call, and returns the ordered content
//! blocks together with the stop reason and token usage.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::message::{ContentBlock, ConversationMessage};

/// A tool definition sent to the model so it knows what it may call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema for the tool input
    pub input_schema: serde_json::Value,
}

/// Where to place prompt-cache boundaries.
///
/// Marking the system prompt and/or the final tool schema lets the backend
/// bill the repeated prefix at the cache-read rate on later calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CachePolicy {
    pub system: bool,
    pub tools: bool,
}

impl CachePolicy {
    pub fn enabled() -> Self {
        Self {
            system: true,
            tools: true,
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }
}

/// One generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRequest {
    /// The model to use (e.g., "claude-sonnet-4-20250514")
    pub model: String,

    /// System prompt (persona instructions)
    pub system: String,

    /// Tools the model may call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSchema>,

    /// Full history for this request
    pub messages: Vec<ConversationMessage>,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Prompt-cache markers
    #[serde(default)]
    pub cache: CachePolicy,
}

/// Why the backend ended the turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
}

impl StopReason {
    /// Classify a backend stop reason string.
    ///
    /// Anything other than `tool_use` and `max_tokens` (e.g. `stop_sequence`)
    /// terminates the turn normally.
    pub fn from_api(reason: Option<&str>) -> Self {
        match reason {
            Some("tool_use") => Self::ToolUse,
            Some("max_tokens") => Self::MaxTokens,
            _ => Self::EndTurn,
        }
    }
}

/// Token usage for one call, split by billing class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Uncached input tokens
    pub input_tokens: u32,
    pub output_tokens: u32,
    #[serde(default)]
    pub cache_read_tokens: u32,
    #[serde(default)]
    pub cache_write_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.input_tokens as u64
            + self.output_tokens as u64
            + self.cache_read_tokens as u64
            + self.cache_write_tokens as u64
    }

    /// Accumulate another call's usage into this one.
    pub fn add(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.cache_read_tokens += other.cache_read_tokens;
        self.cache_write_tokens += other.cache_write_tokens;
    }
}

/// The parsed reply of one generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    /// Ordered content blocks as produced by the model
    pub content: Vec<ContentBlock>,

    pub stop_reason: StopReason,

    pub usage: TokenUsage,

    /// Which model actually responded (may differ from requested)
    pub model: String,
}

/// The core ModelClient trait.
///
/// The orchestrator calls `complete()` without knowing which backend is in
/// use. Transport, auth, and rate-limit failures come back as [`ModelError`]
/// and are fatal for the request.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// A human-readable name for this backend (e.g. "anthropic").
    fn name(&self) -> &str;

    /// Send one request and wait for the complete reply.
    async fn complete(&self, request: ModelRequest) -> std::result::Result<ModelResponse, ModelError>;
}
