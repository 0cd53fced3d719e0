//! Per-request session state.

use grantscout_core::{AccessTier, ConversationMessage};
use std::sync::Arc;

/// Ephemeral state for one request: created at request start, dropped when
/// the stream closes. The message list is append-only.
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    persona: String,
    tier: Arc<AccessTier>,
    messages: Vec<ConversationMessage>,
    iterations: u32,
}

impl Session {
    pub fn new(
        persona: impl Into<String>,
        tier: AccessTier,
        messages: Vec<ConversationMessage>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            persona: persona.into(),
            tier: Arc::new(tier),
            messages,
            iterations: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn persona(&self) -> &str {
        &self.persona
    }

    pub fn tier(&self) -> Arc<AccessTier> {
        Arc::clone(&self.tier)
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    pub fn push(&mut self, message: ConversationMessage) {
        self.messages.push(message);
    }

    /// Model invocations made so far.
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub(crate) fn record_iteration(&mut self) {
        self.iterations += 1;
    }
}
