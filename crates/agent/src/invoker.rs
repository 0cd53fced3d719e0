//! One model call per iteration, with usage recorded on every success.

use grantscout_config::ModelConfig;
use grantscout_core::{
    CachePolicy, ContentBlock, ConversationMessage, ModelClient, ModelError, ModelRequest,
    StopReason, TokenUsage, ToolCall, ToolSchema,
};
use grantscout_telemetry::CostTelemetry;
use std::sync::Arc;
use tracing::debug;

/// Generation parameters shared by every call in a request.
#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub cache: CachePolicy,
}

impl ModelSettings {
    pub fn from_config(config: &ModelConfig) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            cache: if config.prompt_caching {
                CachePolicy::enabled()
            } else {
                CachePolicy::disabled()
            },
        }
    }
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self::from_config(&ModelConfig::default())
    }
}

/// The parsed result of one model call.
#[derive(Debug, Clone)]
pub struct ModelTurn {
    /// Content blocks in the order the model produced them.
    pub content: Vec<ContentBlock>,
    pub text_blocks: Vec<String>,
    pub tool_uses: Vec<ToolCall>,
    pub stop_reason: StopReason,
    pub usage: TokenUsage,
    pub model: String,
}

impl ModelTurn {
    /// The prose of this turn, text blocks joined in order.
    pub fn text(&self) -> String {
        self.text_blocks.join("")
    }

    /// Whether the loop should dispatch tools for this turn.
    pub fn wants_tools(&self) -> bool {
        self.stop_reason == StopReason::ToolUse && !self.tool_uses.is_empty()
    }
}

/// Wraps a [`ModelClient`] with fixed settings and cost accounting.
pub struct ModelInvoker {
    client: Arc<dyn ModelClient>,
    telemetry: Arc<CostTelemetry>,
    settings: ModelSettings,
}

impl ModelInvoker {
    pub fn new(
        client: Arc<dyn ModelClient>,
        telemetry: Arc<CostTelemetry>,
        settings: ModelSettings,
    ) -> Self {
        Self {
            client,
            telemetry,
            settings,
        }
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    pub fn telemetry(&self) -> &Arc<CostTelemetry> {
        &self.telemetry
    }

    pub async fn invoke(
        &self,
        system: &str,
        tools: Vec<ToolSchema>,
        messages: &[ConversationMessage],
    ) -> Result<ModelTurn, ModelError> {
        let request = ModelRequest {
            model: self.settings.model.clone(),
            system: system.to_string(),
            tools,
            messages: messages.to_vec(),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            cache: self.settings.cache,
        };

        debug!(
            client = self.client.name(),
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Invoking model"
        );

        let response = self.client.complete(request).await?;

        let model = if response.model.is_empty() {
            self.settings.model.clone()
        } else {
            response.model
        };
        self.telemetry.record(&model, &response.usage);

        let mut text_blocks = Vec::new();
        let mut tool_uses = Vec::new();
        for block in &response.content {
            match block {
                ContentBlock::Text { text } => text_blocks.push(text.clone()),
                ContentBlock::ToolUse { .. } => tool_uses.extend(ToolCall::from_block(block)),
                ContentBlock::ToolResult { .. } => {}
            }
        }

        Ok(ModelTurn {
            content: response.content,
            text_blocks,
            tool_uses,
            stop_reason: response.stop_reason,
            usage: response.usage,
            model,
        })
    }
}
