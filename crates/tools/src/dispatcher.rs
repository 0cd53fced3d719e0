//! Concurrent tool execution with per-call isolation.
//!
//! All tool calls of one model turn run concurrently and are joined before
//! the model is resumed. Every call produces exactly one [`ToolOutcome`]:
//! unknown tools, errors, timeouts and panics become `is_error` outcomes for
//! that call only and never reach sibling calls.

use futures::FutureExt;
use grantscout_core::{AccessTier, Tool, ToolCall, ToolError, ToolOutcome, ToolRegistry};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::redact::redact;
use crate::summary::Summarizer;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Executes tool calls against a shared registry.
#[derive(Clone)]
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    timeout: Duration,
    summarizer: Summarizer,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            timeout: DEFAULT_TIMEOUT,
            summarizer: Summarizer::default(),
        }
    }

    /// Bound each tool execution.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_summarizer(mut self, summarizer: Summarizer) -> Self {
        self.summarizer = summarizer;
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Execute a single call.
    pub async fn execute(&self, call: &ToolCall, tier: &AccessTier) -> ToolOutcome {
        let tool = self.registry.get(&call.name);
        invoke(tool, call, tier, self.timeout, self.summarizer).await
    }

    /// Execute every call concurrently and return outcomes in call order.
    ///
    /// Dropping the returned future aborts calls still in flight.
    pub async fn execute_all(&self, calls: &[ToolCall], tier: Arc<AccessTier>) -> Vec<ToolOutcome> {
        if calls.is_empty() {
            return Vec::new();
        }

        let mut join_set = JoinSet::new();
        for (idx, call) in calls.iter().enumerate() {
            let tool = self.registry.get(&call.name);
            let call = call.clone();
            let tier = Arc::clone(&tier);
            let timeout = self.timeout;
            let summarizer = self.summarizer;

            join_set.spawn(async move {
                let outcome = invoke(tool, &call, &tier, timeout, summarizer).await;
                (idx, outcome)
            });
        }

        let mut slots: Vec<Option<ToolOutcome>> = vec![None; calls.len()];
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((idx, outcome)) => slots[idx] = Some(outcome),
                Err(join_err) => warn!(error = %join_err, "Tool task did not complete"),
            }
        }

        // A task that vanished without reporting still owes its call an outcome.
        slots
            .into_iter()
            .zip(calls)
            .map(|(slot, call)| {
                slot.unwrap_or_else(|| {
                    ToolOutcome::failure(
                        call,
                        &ToolError::ExecutionFailed {
                            tool_name: call.name.clone(),
                            reason: "task aborted".into(),
                        },
                    )
                })
            })
            .collect()
    }
}

/// Run one call to completion, converting every failure mode into an outcome.
async fn invoke(
    tool: Option<Arc<dyn Tool>>,
    call: &ToolCall,
    tier: &AccessTier,
    timeout: Duration,
    summarizer: Summarizer,
) -> ToolOutcome {
    let start = Instant::now();
    let result = match tool {
        Some(tool) => run_guarded(tool.as_ref(), call, tier, timeout).await,
        None => Err(ToolError::NotFound(call.name.clone())),
    };
    let duration_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(mut client_view) => {
            redact(&mut client_view, tier);
            let model_view = summarizer.summarize(&client_view);
            debug!(tool = %call.name, id = %call.id, duration_ms, "Tool succeeded");
            ToolOutcome::success(call, model_view, client_view)
        }
        Err(e) => {
            warn!(tool = %call.name, id = %call.id, duration_ms, error = %e, "Tool failed");
            ToolOutcome::failure(call, &e)
        }
    }
}

async fn run_guarded(
    tool: &dyn Tool,
    call: &ToolCall,
    tier: &AccessTier,
    timeout: Duration,
) -> Result<serde_json::Value, ToolError> {
    let guarded = AssertUnwindSafe(tool.execute(call.input.clone(), tier)).catch_unwind();
    match tokio::time::timeout(timeout, guarded).await {
        Ok(Ok(result)) => result,
        Ok(Err(panic)) => Err(ToolError::Panicked(panic_message(panic.as_ref()))),
        Err(_) => Err(ToolError::Timeout {
            tool_name: call.name.clone(),
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}

/// Readable text of a caught panic payload.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".into()
    }
}
