//! Tool execution and the built-in research search tools for grantscout.
//!
//! - [`ToolDispatcher`] runs one turn's tool calls concurrently with
//!   per-call timeouts and failure isolation, producing a full client view
//!   and a summarized model view for each call.
//! - [`DataService`] is the shared collaborator behind every search tool.
//! - [`default_registry`] wires the catalog over a data service.

pub mod catalog;
pub mod data;
pub mod dispatcher;
pub mod redact;
pub mod summary;

pub use catalog::{SearchTool, default_registry};
pub use data::{DataService, HttpDataService, StaticDataService};
pub use dispatcher::ToolDispatcher;
pub use summary::Summarizer;
