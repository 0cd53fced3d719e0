//! Tool trait: the abstraction over data/search capabilities.
//!
//! Tools are what let the model look things up: search funded grants,
//! clinical trials, patents, publications. Each tool gets the caller's
//! [`AccessTier`] so it can bound result volume.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::access::AccessTier;
use crate::error::ToolError;
use crate::message::ContentBlock;
use crate::model::ToolSchema;

/// A request to execute a tool, lifted from a model `tool_use` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the model's tool_use id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    pub input: serde_json::Value,
}

impl ToolCall {
    /// Extract a call from a content block, if it is a `tool_use`.
    pub fn from_block(block: &ContentBlock) -> Option<Self> {
        match block {
            ContentBlock::ToolUse { id, name, input } => Some(Self {
                id: id.clone(),
                name: name.clone(),
                input: input.clone(),
            }),
            ContentBlock::Text { .. } | ContentBlock::ToolResult { .. } => None,
        }
    }
}

/// The result of one tool call in two representations.
///
/// `client_view` is the full payload streamed to the caller; `model_view` is
/// the summarized payload fed back to the model. On failure both carry
/// `{"error": message}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub tool_use_id: String,
    pub tool_name: String,
    pub model_view: serde_json::Value,
    pub client_view: serde_json::Value,
    pub is_error: bool,
}

impl ToolOutcome {
    pub fn success(
        call: &ToolCall,
        model_view: serde_json::Value,
        client_view: serde_json::Value,
    ) -> Self {
        Self {
            tool_use_id: call.id.clone(),
            tool_name: call.name.clone(),
            model_view,
            client_view,
            is_error: false,
        }
    }

    pub fn failure(call: &ToolCall, error: &ToolError) -> Self {
        let body = serde_json::json!({ "error": error.to_string() });
        Self {
            tool_use_id: call.id.clone(),
            tool_name: call.name.clone(),
            model_view: body.clone(),
            client_view: body,
            is_error: true,
        }
    }

    /// The `tool_result` block the model sees for this outcome.
    pub fn to_result_block(&self) -> ContentBlock {
        ContentBlock::ToolResult {
            tool_use_id: self.tool_use_id.clone(),
            content: self.model_view.to_string(),
            is_error: self.is_error,
        }
    }
}

/// The core Tool trait.
///
/// Each catalog tool (search_grants, search_clinical_trials, ...) implements
/// this trait and is registered in the [`ToolRegistry`]. Implementations must
/// tolerate concurrent calls.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "search_grants").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's input.
    fn input_schema(&self) -> serde_json::Value;

    /// Execute the tool and return its full JSON payload.
    async fn execute(
        &self,
        input: serde_json::Value,
        tier: &AccessTier,
    ) -> std::result::Result<serde_json::Value, ToolError>;

    /// Convert this tool into a ToolSchema for sending to the model.
    fn to_schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// A registry of available tools.
///
/// Built once at startup and shared read-only. The orchestrator uses it to:
/// 1. Get the schemas a persona may use
/// 2. Look up tools when the model requests them
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// All tool schemas, sorted by name.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<_> = self.tools.values().map(|t| t.to_schema()).collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    /// Schemas for an allow-list, in allow-list order. Unknown names are skipped.
    pub fn schemas_for(&self, allowed: &[String]) -> Vec<ToolSchema> {
        allowed
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|t| t.to_schema())
            .collect()
    }

    /// List all registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
