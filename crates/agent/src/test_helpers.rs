//! Scripted model client for orchestrator and gateway tests.

use async_trait::async_trait;
use grantscout_core::{
    ContentBlock, ModelClient, ModelError, ModelRequest, ModelResponse, StopReason, TokenUsage,
};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Model id reported by scripted responses.
pub const SCRIPTED_MODEL: &str = "claude-sonnet-4-20250514";

/// A model client that replays a fixed script.
///
/// Each call to `complete` pops the next entry and records the request.
/// Running past the end yields `ModelError::InvalidResponse`.
pub struct ScriptedModelClient {
    script: Mutex<VecDeque<Result<ModelResponse, ModelError>>>,
    requests: Mutex<Vec<ModelRequest>>,
    delay: Option<Duration>,
}

impl ScriptedModelClient {
    pub fn new(responses: Vec<ModelResponse>) -> Self {
        Self::from_results(responses.into_iter().map(Ok).collect())
    }

    pub fn from_results(script: Vec<Result<ModelResponse, ModelError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedModelClient {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        let call = {
            let mut requests = self.requests.lock().unwrap_or_else(|e| e.into_inner());
            requests.push(request);
            requests.len()
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| {
                Err(ModelError::InvalidResponse(format!(
                    "script exhausted at call #{call}"
                )))
            })
    }
}

fn usage() -> TokenUsage {
    TokenUsage {
        input_tokens: 1200,
        output_tokens: 80,
        cache_read_tokens: 0,
        cache_write_tokens: 0,
    }
}

/// A terminal turn with a single text block.
pub fn text_response(text: &str) -> ModelResponse {
    ModelResponse {
        content: vec![ContentBlock::text(text)],
        stop_reason: StopReason::EndTurn,
        usage: usage(),
        model: SCRIPTED_MODEL.into(),
    }
}

/// A terminal turn cut off by the output cap.
pub fn truncated_response(text: &str) -> ModelResponse {
    ModelResponse {
        stop_reason: StopReason::MaxTokens,
        ..text_response(text)
    }
}

/// A tool-calling turn: optional preamble text, then one block per call.
pub fn tool_use_response(
    text: &str,
    calls: Vec<(&str, &str, serde_json::Value)>,
) -> ModelResponse {
    let mut content = Vec::new();
    if !text.is_empty() {
        content.push(ContentBlock::text(text));
    }
    for (id, name, input) in calls {
        content.push(ContentBlock::ToolUse {
            id: id.into(),
            name: name.into(),
            input,
        });
    }
    ModelResponse {
        content,
        stop_reason: StopReason::ToolUse,
        usage: usage(),
        model: SCRIPTED_MODEL.into(),
    }
}
