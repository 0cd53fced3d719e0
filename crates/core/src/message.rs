//! Conversation message and content block types.
//!
//! A request carries the full history (the server keeps none). Each message
//! is either plain text or a list of typed [`ContentBlock`]s. The orchestrator
//! only ever appends to a message list; it never edits an earlier message.

use serde::{Deserialize, Serialize};

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user (and tool results, which are sent back as user turns)
    User,
    /// The model
    Assistant,
}

/// One unit of a model turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Prose.
    Text { text: String },

    /// The model asks for a tool to be run.
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },

    /// The answer to an earlier `ToolUse` with the same id.
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default, skip_serializing_if = "is_false")]
        is_error: bool,
    },
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Wire name of the block kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::ToolUse { .. } => "tool_use",
            Self::ToolResult { .. } => "tool_result",
        }
    }
}

/// Message body: a bare string or a list of blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl ConversationMessage {
    /// Create a plain-text user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    /// Create a plain-text assistant message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text(text.into()),
        }
    }

    /// Echo a model turn back into the history exactly as it was produced.
    pub fn assistant_blocks(blocks: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Blocks(blocks),
        }
    }

    /// Tool results travel back to the model as a user turn.
    pub fn tool_results(blocks: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Blocks(blocks),
        }
    }

    /// Borrow the content as a block slice view. Plain text yields no blocks.
    pub fn blocks(&self) -> &[ContentBlock] {
        match &self.content {
            MessageContent::Text(_) => &[],
            MessageContent::Blocks(blocks) => blocks,
        }
    }

    /// All prose in this message, text blocks joined by newlines.
    pub fn text(&self) -> String {
        match &self.content {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    ContentBlock::ToolUse { .. } | ContentBlock::ToolResult { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Every `tool_use` block as a dispatchable call, in order.
    pub fn tool_uses(&self) -> Vec<crate::tool::ToolCall> {
        self.blocks()
            .iter()
            .filter_map(crate::tool::ToolCall::from_block)
            .collect()
    }

    /// Ids of every `tool_use` block, in order.
    pub fn tool_use_ids(&self) -> Vec<&str> {
        self.blocks()
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolUse { id, .. } => Some(id.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Ids answered by `tool_result` blocks, in order.
    pub fn tool_result_ids(&self) -> Vec<&str> {
        self.blocks()
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolResult { tool_use_id, .. } => Some(tool_use_id.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Whether the content is empty (blank text or no blocks).
    pub fn is_empty(&self) -> bool {
        match &self.content {
            MessageContent::Text(text) => text.trim().is_empty(),
            MessageContent::Blocks(blocks) => blocks.is_empty(),
        }
    }
}

/// Check that every `tool_use` is answered by exactly one `tool_result`
/// with the same id in the message that immediately follows it.
///
/// Returns a description of the first violation found.
pub fn tool_pairing_violation(messages: &[ConversationMessage]) -> Option<String> {
    for (i, msg) in messages.iter().enumerate() {
        let uses = msg.tool_use_ids();
        if uses.is_empty() {
            continue;
        }
        let Some(next) = messages.get(i + 1) else {
            return Some(format!("message {i}: tool_use without a following result turn"));
        };
        let mut results = next.tool_result_ids();
        let mut expected = uses.clone();
        results.sort_unstable();
        expected.sort_unstable();
        if results != expected {
            return Some(format!(
                "message {i}: tool_use ids {uses:?} answered by {:?}",
                next.tool_result_ids()
            ));
        }
    }
    None
}
