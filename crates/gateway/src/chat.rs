//! `POST /v1/chat`: validate, resolve the caller's tier, stream frames.
//!
//! Validation happens entirely before the orchestrator is touched, so a
//! malformed request never costs a model call.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::Stream;
use grantscout_agent::{Frame, Session};
use grantscout_core::{ContentBlock, ConversationMessage, PersonaRegistry, RequestError, Role};
use grantscout_security::{AuditEvent, AuditOutcome, resolve_audited};
use serde::Deserialize;
use std::convert::Infallible;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;

use crate::error::ApiError;
use crate::{SharedState, caller_identity};

/// Data line that closes a successful stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Inbound chat body. Both fields are optional here so that a missing field
/// is reported as such instead of as a generic parse failure.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Option<Vec<ConversationMessage>>,
    pub persona: Option<String>,
}

/// Check a request against the persona registry.
pub fn validate(
    request: ChatRequest,
    personas: &PersonaRegistry,
) -> Result<(String, Vec<ConversationMessage>), RequestError> {
    let messages = request.messages.ok_or(RequestError::MissingField("messages"))?;
    let persona = request.persona.ok_or(RequestError::MissingField("persona"))?;

    if messages.is_empty() {
        return Err(RequestError::EmptyMessages);
    }
    for (index, message) in messages.iter().enumerate() {
        // Tool traffic is produced server-side only.
        if let Some(block) = message
            .blocks()
            .iter()
            .find(|b| !matches!(b, ContentBlock::Text { .. }))
        {
            return Err(RequestError::UnsupportedContent {
                index,
                kind: block.kind(),
            });
        }
        if message.is_empty() {
            return Err(RequestError::EmptyContent(index));
        }
    }
    if messages.last().map(|m| m.role) != Some(Role::User) {
        return Err(RequestError::LastMessageNotUser);
    }
    if !personas.contains(&persona) {
        return Err(RequestError::UnknownPersona(persona));
    }

    Ok((persona, messages))
}

fn to_event(frame: &Frame) -> Event {
    match frame {
        Frame::Done => Event::default().data(DONE_SENTINEL),
        frame => {
            let data = serde_json::to_string(frame).unwrap_or_default();
            Event::default().event(frame.event_type()).data(data)
        }
    }
}

pub async fn chat_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let identity = caller_identity(&headers);

    let validated = match payload {
        Ok(Json(request)) => validate(request, state.orchestrator.personas()).map_err(ApiError::from),
        Err(rejection) => Err(ApiError::from(rejection)),
    };
    let (persona, messages) = match validated {
        Ok(v) => v,
        Err(err) => {
            state.audit.log(
                AuditEvent::RequestRejected {
                    kind: err.kind.to_string(),
                },
                &identity,
                AuditOutcome::Denied,
                Some(err.message.clone()),
            );
            return Err(err);
        }
    };

    let tier = resolve_audited(state.resolver.as_ref(), &identity, &state.audit).await;
    let session = Session::new(persona, tier, messages);

    info!(
        session_id = session.id(),
        persona = session.persona(),
        tier = %session.tier().tier,
        messages = session.messages().len(),
        "Chat request accepted"
    );

    let rx = state.orchestrator.spawn(session);
    let stream = ReceiverStream::new(rx).map(|frame| Ok(to_event(&frame)));

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
