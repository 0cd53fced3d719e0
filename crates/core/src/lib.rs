//! # grantscout core
//!
//! Domain types, traits, and error definitions for the grantscout
//! tool-augmented conversation runtime. This crate has **no framework
//! dependencies**: it defines the model every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here:
//! - [`ModelClient`]: the text-generation backend
//! - [`Tool`]: an externally implemented data/search capability
//! - [`AccessResolver`]: identity → access tier policy
//!
//! Implementations live in their own crates and are injected into the
//! orchestrator at startup, so tests swap in scripted fakes freely.

pub mod access;
pub mod error;
pub mod message;
pub mod model;
pub mod persona;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use access::{AccessResolver, AccessTier, CallerIdentity};
pub use error::{AccessError, Error, ModelError, RequestError, Result, ToolError};
pub use message::{ContentBlock, ConversationMessage, MessageContent, Role};
pub use model::{
    CachePolicy, ModelClient, ModelRequest, ModelResponse, StopReason, TokenUsage, ToolSchema,
};
pub use persona::{Persona, PersonaRegistry};
pub use tool::{Tool, ToolCall, ToolOutcome, ToolRegistry};
