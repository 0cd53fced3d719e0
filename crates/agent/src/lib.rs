//! The orchestration loop for grantscout.
//!
//! A request runs as a bounded **model → tools → model** cycle:
//!
//! 1. **Invoke** the model with the persona's prompt, its allowed tool
//!    schemas and the session history
//! 2. **If `tool_use`**: dispatch every call concurrently, stream the full
//!    results as frames, append the summarized results to the session, loop
//! 3. **Otherwise**: stream the prose and finish
//!
//! The loop also stops after `max_iterations` model calls. The frame stream
//! always ends with exactly one `done` or `error`.

pub mod frame;
pub mod invoker;
pub mod orchestrator;
pub mod session;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use frame::{Frame, FrameSink};
pub use invoker::{ModelInvoker, ModelSettings, ModelTurn};
pub use orchestrator::{Orchestrator, OrchestratorSettings, RunSummary, StopCause};
pub use session::Session;
