//! Error types for the grantscout domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; the top-level [`Error`]
//! wraps them. Propagation rules:
//!
//! - [`RequestError`] is raised before any model call and never streamed.
//! - [`AccessError`] is absorbed by degrading to the most restrictive tier.
//! - [`ModelError`] is fatal for the request and ends the stream with an `error` frame.
//! - [`ToolError`] never crosses the dispatcher; it becomes an `is_error` outcome.

use thiserror::Error;

/// The top-level error type for all grantscout operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Model backend errors ---
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Malformed requests ---
    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    // --- Access resolution ---
    #[error("Access error: {0}")]
    Access(#[from] AccessError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The caller went away before the run finished.
    #[error("Request cancelled by caller")]
    Cancelled,

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures talking to the text-generation backend. Always fatal for a request.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by model backend, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model backend not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unreadable model response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool timed out: {tool_name} after {timeout_ms}ms")]
    Timeout { tool_name: String, timeout_ms: u64 },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Data service error: {0}")]
    Backend(String),

    #[error("Tool panicked: {0}")]
    Panicked(String),
}

/// Malformed inbound requests, rejected before the loop starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("Request body is not valid JSON: {0}")]
    InvalidBody(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("At least one message is required")]
    EmptyMessages,

    #[error("The last message must come from the user")]
    LastMessageNotUser,

    #[error("Message {index} carries content the caller may not send ({kind})")]
    UnsupportedContent { index: usize, kind: &'static str },

    #[error("Message {0} has empty content")]
    EmptyContent(usize),

    #[error("Unknown persona: {0}")]
    UnknownPersona(String),
}

impl RequestError {
    /// Stable machine-readable kind for JSON error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidBody(_) => "invalid_body",
            Self::MissingField(_) => "missing_field",
            Self::EmptyMessages => "empty_messages",
            Self::LastMessageNotUser => "last_message_not_user",
            Self::UnsupportedContent { .. } => "unsupported_content",
            Self::EmptyContent(_) => "empty_content",
            Self::UnknownPersona(_) => "unknown_persona",
        }
    }
}

/// Identity was presented but no tier could be resolved for it.
#[derive(Debug, Clone, Error)]
pub enum AccessError {
    #[error("Unrecognized caller token")]
    UnknownToken,

    #[error("Tier '{0}' is not defined")]
    UnknownTier(String),

    #[error("Access service unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_error_displays_correctly() {
        let err = Error::Model(ModelError::ApiError {
            status_code: 529,
            message: "Overloaded".into(),
        });
        assert!(err.to_string().contains("529"));
        assert!(err.to_string().contains("Overloaded"));
    }

    #[test]
    fn tool_error_displays_correctly() {
        let err = Error::Tool(ToolError::Timeout {
            tool_name: "search_grants".into(),
            timeout_ms: 30_000,
        });
        assert!(err.to_string().contains("search_grants"));
        assert!(err.to_string().contains("30000ms"));
    }

    #[test]
    fn request_error_kinds_are_stable() {
        assert_eq!(RequestError::MissingField("persona").kind(), "missing_field");
        assert_eq!(
            RequestError::UnknownPersona("x".into()).kind(),
            "unknown_persona"
        );
        assert!(
            RequestError::MissingField("persona")
                .to_string()
                .contains("persona")
        );
    }
}
