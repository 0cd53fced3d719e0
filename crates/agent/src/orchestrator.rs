//! The iteration loop: model, tools, model, ... until a terminal turn.
//!
//! Each iteration makes one model call. A `tool_use` turn has its calls
//! dispatched concurrently, the results streamed and appended to the session,
//! and the loop continues. Any other stop reason ends the request after its
//! prose is streamed. The iteration cap ends the loop silently.

use grantscout_config::{IntermediateText, OrchestratorConfig};
use grantscout_core::{
    ConversationMessage, Error, PersonaRegistry, RequestError, Result, StopReason, TokenUsage,
    ToolCall, ToolError, ToolOutcome,
};
use futures::FutureExt;
use grantscout_tools::ToolDispatcher;
use grantscout_tools::dispatcher::panic_message;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::frame::{Frame, FrameSink};
use crate::invoker::ModelInvoker;
use crate::session::Session;

/// Loop behavior knobs.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Maximum model invocations per request.
    pub max_iterations: u32,

    /// Whether prose accompanying tool calls is streamed.
    pub intermediate_text: IntermediateText,

    /// Text frame appended once when the terminal turn hit `max_tokens`.
    pub truncation_notice: String,
}

impl OrchestratorSettings {
    pub fn from_config(config: &OrchestratorConfig) -> Self {
        Self {
            max_iterations: config.max_iterations.max(1),
            intermediate_text: config.intermediate_text,
            truncation_notice: config.truncation_notice.clone(),
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from_config(&OrchestratorConfig::default())
    }
}

/// How the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCause {
    /// The model produced a terminal turn.
    Completed,
    /// The terminal turn was cut off by the output cap.
    Truncated,
    /// The iteration cap was reached after a tool-calling turn.
    IterationCap,
}

/// Totals for one request.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub iterations: u32,
    pub tool_calls: usize,
    pub usage: TokenUsage,
    pub cause: StopCause,
}

pub struct Orchestrator {
    invoker: ModelInvoker,
    dispatcher: ToolDispatcher,
    personas: Arc<PersonaRegistry>,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    pub fn new(
        invoker: ModelInvoker,
        dispatcher: ToolDispatcher,
        personas: Arc<PersonaRegistry>,
    ) -> Self {
        Self {
            invoker,
            dispatcher,
            personas,
            settings: OrchestratorSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: OrchestratorSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn personas(&self) -> &Arc<PersonaRegistry> {
        &self.personas
    }

    pub fn dispatcher(&self) -> &ToolDispatcher {
        &self.dispatcher
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Drive one request to its end, writing frames to `sink`.
    ///
    /// Never writes a terminal frame; the caller decides between `done` and
    /// `error` from the result.
    pub async fn run(&self, session: &mut Session, sink: &mut FrameSink) -> Result<RunSummary> {
        let persona = self
            .personas
            .get(session.persona())
            .ok_or_else(|| RequestError::UnknownPersona(session.persona().to_string()))?;
        let tools = self.dispatcher.registry().schemas_for(&persona.tools);

        let mut summary = RunSummary {
            iterations: 0,
            tool_calls: 0,
            usage: TokenUsage::default(),
            cause: StopCause::Completed,
        };

        loop {
            let turn = self
                .invoker
                .invoke(&persona.system_prompt, tools.clone(), session.messages())
                .await?;
            session.record_iteration();
            summary.iterations = session.iterations();
            summary.usage.add(&turn.usage);

            debug!(
                session_id = session.id(),
                iteration = session.iterations(),
                stop_reason = ?turn.stop_reason,
                tool_uses = turn.tool_uses.len(),
                "Model turn"
            );

            if !turn.wants_tools() {
                let text = turn.text();
                if !text.is_empty() {
                    sink.send(Frame::Text { content: text }).await?;
                }
                if turn.stop_reason == StopReason::MaxTokens {
                    sink.send(Frame::Text {
                        content: self.settings.truncation_notice.clone(),
                    })
                    .await?;
                    summary.cause = StopCause::Truncated;
                }
                break;
            }

            if self.settings.intermediate_text == IntermediateText::Emit {
                let text = turn.text();
                if !text.is_empty() {
                    sink.send(Frame::Text { content: text }).await?;
                }
            }

            sink.send(Frame::ToolStart {
                tools: turn.tool_uses.iter().map(|c| c.name.clone()).collect(),
            })
            .await?;

            let outcomes = self.dispatch(&persona.tools, &turn.tool_uses, session).await;

            for outcome in &outcomes {
                sink.send(Frame::ToolResult {
                    id: outcome.tool_use_id.clone(),
                    name: outcome.tool_name.clone(),
                    result: outcome.client_view.clone(),
                    is_error: outcome.is_error,
                })
                .await?;
            }
            sink.send(Frame::ToolComplete {
                count: outcomes.len(),
            })
            .await?;

            summary.tool_calls += outcomes.len();
            session.push(ConversationMessage::assistant_blocks(turn.content));
            session.push(ConversationMessage::tool_results(
                outcomes.iter().map(ToolOutcome::to_result_block).collect(),
            ));

            if session.iterations() >= self.settings.max_iterations {
                info!(
                    session_id = session.id(),
                    max_iterations = self.settings.max_iterations,
                    "Iteration cap reached"
                );
                summary.cause = StopCause::IterationCap;
                break;
            }
        }

        Ok(summary)
    }

    /// Run the turn's calls, refusing any the persona does not allow.
    async fn dispatch(
        &self,
        allowed: &[String],
        calls: &[ToolCall],
        session: &Session,
    ) -> Vec<ToolOutcome> {
        let (permitted, refused): (Vec<_>, Vec<_>) = calls
            .iter()
            .enumerate()
            .partition(|(_, call)| allowed.iter().any(|name| name == &call.name));

        let permitted_calls: Vec<ToolCall> = permitted.iter().map(|(_, c)| (*c).clone()).collect();
        let mut results = self
            .dispatcher
            .execute_all(&permitted_calls, session.tier())
            .await
            .into_iter();

        let mut slots: Vec<Option<ToolOutcome>> = vec![None; calls.len()];
        for (idx, _) in &permitted {
            slots[*idx] = results.next();
        }
        for (idx, call) in refused {
            warn!(session_id = session.id(), tool = %call.name, "Tool not allowed for persona");
            slots[idx] = Some(ToolOutcome::failure(
                call,
                &ToolError::NotFound(call.name.clone()),
            ));
        }

        slots
            .into_iter()
            .zip(calls)
            .map(|(slot, call)| {
                slot.unwrap_or_else(|| {
                    ToolOutcome::failure(call, &ToolError::NotFound(call.name.clone()))
                })
            })
            .collect()
    }

    /// Run a session on its own task and return the frame stream.
    ///
    /// The stream always ends with exactly one `done` or `error` frame,
    /// unless the receiver is dropped first, which cancels the run.
    pub fn spawn(self: &Arc<Self>, mut session: Session) -> mpsc::Receiver<Frame> {
        let (tx, rx) = mpsc::channel(crate::frame::FRAME_BUFFER);
        let this = Arc::clone(self);

        tokio::spawn(async move {
            let started = Instant::now();
            let mut sink = FrameSink::new(tx.clone());

            let guarded = AssertUnwindSafe(this.run(&mut session, &mut sink)).catch_unwind();
            let result = tokio::select! {
                result = guarded => result.unwrap_or_else(|panic| {
                    Err(Error::Internal(panic_message(panic.as_ref())))
                }),
                _ = tx.closed() => Err(Error::Cancelled),
            };

            match result {
                Ok(summary) => {
                    info!(
                        session_id = session.id(),
                        persona = session.persona(),
                        iterations = summary.iterations,
                        tool_calls = summary.tool_calls,
                        input_tokens = summary.usage.input_tokens,
                        output_tokens = summary.usage.output_tokens,
                        cause = ?summary.cause,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Request complete"
                    );
                    let _ = sink.send(Frame::Done).await;
                }
                Err(Error::Cancelled) => {
                    info!(
                        session_id = session.id(),
                        iterations = session.iterations(),
                        "Client disconnected, request cancelled"
                    );
                }
                Err(e) => {
                    error!(session_id = session.id(), error = %e, "Request failed");
                    let _ = sink.send(Frame::Error { message: e.to_string() }).await;
                }
            }
        });

        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoker::ModelSettings;
    use crate::test_helpers::{
        ScriptedModelClient, text_response, tool_use_response, truncated_response,
    };
    use grantscout_core::{AccessTier, ContentBlock, ModelError, message::tool_pairing_violation};
    use grantscout_telemetry::CostTelemetry;
    use grantscout_tools::{StaticDataService, default_registry};
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn tier() -> AccessTier {
        AccessTier {
            tier: "enterprise".into(),
            results_limit: 500,
            can_export: true,
            can_see_emails: true,
            can_see_abstracts: true,
            quota: None,
        }
    }

    fn orchestrator(client: Arc<ScriptedModelClient>) -> Arc<Orchestrator> {
        orchestrator_with(client, OrchestratorSettings::default())
    }

    fn orchestrator_with(
        client: Arc<ScriptedModelClient>,
        settings: OrchestratorSettings,
    ) -> Arc<Orchestrator> {
        let invoker = ModelInvoker::new(
            client,
            Arc::new(CostTelemetry::new()),
            ModelSettings::default(),
        );
        let registry = default_registry(Arc::new(StaticDataService::sample()));
        let dispatcher = ToolDispatcher::new(Arc::new(registry));
        Arc::new(
            Orchestrator::new(invoker, dispatcher, Arc::new(PersonaRegistry::builtin()))
                .with_settings(settings),
        )
    }

    fn session(persona: &str, text: &str) -> Session {
        Session::new(persona, tier(), vec![ConversationMessage::user(text)])
    }

    async fn collect(mut rx: mpsc::Receiver<Frame>) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Some(frame) = rx.recv().await {
            frames.push(frame);
        }
        frames
    }

    fn terminal_count(frames: &[Frame]) -> usize {
        frames.iter().filter(|f| f.is_terminal()).count()
    }

    #[tokio::test]
    async fn plain_answer_streams_text_then_done() {
        let client = Arc::new(ScriptedModelClient::new(vec![text_response("Hello.")]));
        let frames = collect(orchestrator(Arc::clone(&client)).spawn(session("general", "hi"))).await;

        assert_eq!(
            frames,
            vec![Frame::Text { content: "Hello.".into() }, Frame::Done]
        );
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn tool_turn_streams_results_between_start_and_complete() {
        let client = Arc::new(ScriptedModelClient::new(vec![
            tool_use_response(
                "",
                vec![
                    ("toolu_a", "search_grants", json!({"query": "ALS"})),
                    ("toolu_b", "search_clinical_trials", json!({"query": "ALS"})),
                ],
            ),
            text_response("Found several."),
        ]));
        let frames = collect(orchestrator(Arc::clone(&client)).spawn(session("general", "ALS"))).await;

        assert_eq!(frames[0].event_type(), "tool_start");
        assert_eq!(frames[1].event_type(), "tool_result");
        assert_eq!(frames[2].event_type(), "tool_result");
        assert_eq!(frames[3], Frame::ToolComplete { count: 2 });
        assert_eq!(frames[4], Frame::Text { content: "Found several.".into() });
        assert_eq!(frames[5], Frame::Done);
        assert_eq!(frames.len(), 6);

        let Frame::ToolStart { tools } = &frames[0] else { panic!("expected tool_start") };
        assert_eq!(tools, &vec!["search_grants".to_string(), "search_clinical_trials".to_string()]);
        let Frame::ToolResult { id, .. } = &frames[1] else { panic!("expected tool_result") };
        assert_eq!(id, "toolu_a");

        // The second call sees the tool_use turn and exactly one result per id.
        let requests = client.requests();
        assert_eq!(requests.len(), 2);
        let history = &requests[1].messages;
        assert_eq!(history.len(), 3);
        assert_eq!(history[1].tool_use_ids(), vec!["toolu_a", "toolu_b"]);
        assert_eq!(history[2].tool_result_ids(), vec!["toolu_a", "toolu_b"]);
        assert!(tool_pairing_violation(history).is_none());
    }

    #[tokio::test]
    async fn failing_tool_does_not_stop_the_turn() {
        let client = Arc::new(ScriptedModelClient::new(vec![
            tool_use_response(
                "",
                vec![
                    ("toolu_bad", "search_grants", json!({"org_state": "MD"})),
                    ("toolu_ok", "search_patents", json!({"query": "TDP-43"})),
                ],
            ),
            text_response("One search failed."),
        ]));
        let frames = collect(orchestrator(Arc::clone(&client)).spawn(session("general", "x"))).await;

        let results: Vec<_> = frames
            .iter()
            .filter_map(|f| match f {
                Frame::ToolResult { id, is_error, result, .. } => Some((id.clone(), *is_error, result.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "toolu_bad");
        assert!(results[0].1);
        assert!(results[0].2["error"].is_string());
        assert!(!results[1].1);
        assert_eq!(frames.last(), Some(&Frame::Done));

        let history = &client.requests()[1].messages;
        let blocks = history[2].blocks();
        assert!(matches!(&blocks[0], ContentBlock::ToolResult { is_error: true, .. }));
        assert!(matches!(&blocks[1], ContentBlock::ToolResult { is_error: false, .. }));
    }

    #[tokio::test]
    async fn disallowed_tool_is_refused() {
        let client = Arc::new(ScriptedModelClient::new(vec![
            tool_use_response("", vec![("toolu_1", "search_patents", json!({"query": "ALS"}))]),
            text_response("That tool is not available here."),
        ]));
        let frames = collect(orchestrator(client).spawn(session("trials", "x"))).await;

        let Frame::ToolResult { is_error, result, .. } = &frames[1] else {
            panic!("expected tool_result")
        };
        assert!(is_error);
        assert!(result["error"].as_str().unwrap().contains("search_patents"));
        assert_eq!(frames.last(), Some(&Frame::Done));
    }

    #[tokio::test]
    async fn iteration_cap_stops_silently() {
        let call = || tool_use_response("", vec![("toolu_1", "search_grants", json!({"query": "ALS"}))]);
        let client = Arc::new(ScriptedModelClient::new(vec![call(), call(), call(), call()]));
        let settings = OrchestratorSettings {
            max_iterations: 2,
            ..OrchestratorSettings::default()
        };
        let frames =
            collect(orchestrator_with(Arc::clone(&client), settings).spawn(session("grants", "x"))).await;

        assert_eq!(client.call_count(), 2);
        assert_eq!(
            frames.iter().filter(|f| f.event_type() == "tool_complete").count(),
            2
        );
        assert!(frames.iter().all(|f| !matches!(f, Frame::Error { .. } | Frame::Text { .. })));
        assert_eq!(frames.last(), Some(&Frame::Done));
        assert_eq!(terminal_count(&frames), 1);
    }

    #[tokio::test]
    async fn truncation_notice_appended_once() {
        let client = Arc::new(ScriptedModelClient::new(vec![truncated_response("Partial answer")]));
        let settings = OrchestratorSettings {
            truncation_notice: "[truncated]".into(),
            ..OrchestratorSettings::default()
        };
        let frames = collect(orchestrator_with(client, settings).spawn(session("general", "x"))).await;

        assert_eq!(
            frames,
            vec![
                Frame::Text { content: "Partial answer".into() },
                Frame::Text { content: "[truncated]".into() },
                Frame::Done,
            ]
        );
    }

    #[tokio::test]
    async fn model_view_never_larger_than_client_view() {
        let rows: Vec<Value> = (0..50)
            .map(|i| json!({"nct_id": format!("NCT{i:08}"), "brief_title": "ALS study", "conditions": ["ALS"]}))
            .collect();
        let data = StaticDataService::new().with_dataset("clinical_studies", rows);
        let invoker_client = Arc::new(ScriptedModelClient::new(vec![
            tool_use_response("", vec![("toolu_1", "search_clinical_trials", json!({"query": "ALS"}))]),
            text_response("50 studies."),
        ]));
        let invoker = ModelInvoker::new(
            invoker_client.clone(),
            Arc::new(CostTelemetry::new()),
            ModelSettings::default(),
        );
        let dispatcher = ToolDispatcher::new(Arc::new(default_registry(Arc::new(data))));
        let orchestrator = Arc::new(Orchestrator::new(
            invoker,
            dispatcher,
            Arc::new(PersonaRegistry::builtin()),
        ));

        let frames = collect(orchestrator.spawn(session("trials", "ALS"))).await;
        let Frame::ToolResult { result, .. } = &frames[1] else { panic!("expected tool_result") };
        assert_eq!(result["results"].as_array().unwrap().len(), 50);

        let history = &invoker_client.requests()[1].messages;
        let ContentBlock::ToolResult { content, .. } = &history[2].blocks()[0] else {
            panic!("expected tool_result block")
        };
        assert!(content.len() <= result.to_string().len());
        let model_view: Value = serde_json::from_str(content).unwrap();
        assert_eq!(model_view["results_count"], 50);
    }

    #[tokio::test]
    async fn model_failure_ends_with_error_frame() {
        let client = Arc::new(ScriptedModelClient::from_results(vec![
            Ok(tool_use_response("", vec![("toolu_1", "search_grants", json!({"query": "ALS"}))])),
            Err(ModelError::RateLimited { retry_after_secs: 5 }),
        ]));
        let frames = collect(orchestrator(client).spawn(session("grants", "x"))).await;

        assert_eq!(frames[0].event_type(), "tool_start");
        assert!(matches!(frames.last(), Some(Frame::Error { .. })));
        assert!(!frames.contains(&Frame::Done));
        assert_eq!(terminal_count(&frames), 1);
    }

    #[tokio::test]
    async fn unknown_persona_is_an_error() {
        let client = Arc::new(ScriptedModelClient::new(vec![text_response("never")]));
        let frames = collect(orchestrator(Arc::clone(&client)).spawn(session("astrology", "x"))).await;

        assert_eq!(frames.len(), 1);
        assert!(matches!(&frames[0], Frame::Error { message } if message.contains("astrology")));
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn intermediate_text_policy() {
        let script = || {
            vec![
                tool_use_response("Let me search.", vec![("toolu_1", "search_grants", json!({"query": "ALS"}))]),
                text_response("Done."),
            ]
        };

        let suppressed = collect(
            orchestrator(Arc::new(ScriptedModelClient::new(script()))).spawn(session("grants", "x")),
        )
        .await;
        assert_eq!(suppressed[0].event_type(), "tool_start");
        assert_eq!(
            suppressed.iter().filter(|f| f.event_type() == "text").count(),
            1
        );

        let settings = OrchestratorSettings {
            intermediate_text: IntermediateText::Emit,
            ..OrchestratorSettings::default()
        };
        let emitted = collect(
            orchestrator_with(Arc::new(ScriptedModelClient::new(script())), settings)
                .spawn(session("grants", "x")),
        )
        .await;
        assert_eq!(emitted[0], Frame::Text { content: "Let me search.".into() });
        assert_eq!(emitted[1].event_type(), "tool_start");
    }

    #[tokio::test]
    async fn dropped_receiver_cancels_the_run() {
        let client = Arc::new(
            ScriptedModelClient::new(vec![
                tool_use_response("", vec![("toolu_1", "search_grants", json!({"query": "ALS"}))]),
                text_response("unreachable"),
            ])
            .with_delay(std::time::Duration::from_millis(200)),
        );
        let rx = orchestrator(Arc::clone(&client)).spawn(session("grants", "x"));
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        drop(rx);

        tokio::time::sleep(std::time::Duration::from_millis(400)).await;
        assert_eq!(client.call_count(), 1);
    }

    struct PanickingClient;

    #[async_trait::async_trait]
    impl grantscout_core::ModelClient for PanickingClient {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn complete(
            &self,
            _request: grantscout_core::ModelRequest,
        ) -> std::result::Result<grantscout_core::ModelResponse, ModelError> {
            panic!("backend client bug")
        }
    }

    #[tokio::test]
    async fn model_panic_ends_with_error_frame() {
        let invoker = ModelInvoker::new(
            Arc::new(PanickingClient),
            Arc::new(CostTelemetry::new()),
            ModelSettings::default(),
        );
        let registry = default_registry(Arc::new(StaticDataService::sample()));
        let orchestrator = Arc::new(Orchestrator::new(
            invoker,
            ToolDispatcher::new(Arc::new(registry)),
            Arc::new(PersonaRegistry::builtin()),
        ));

        let frames = collect(orchestrator.spawn(session("general", "hi"))).await;
        assert_eq!(frames.len(), 1);
        assert!(
            matches!(&frames[0], Frame::Error { message } if message.contains("backend client bug"))
        );
        assert_eq!(terminal_count(&frames), 1);
    }

    /// Counts starts immediately and finishes only after a long sleep.
    struct SlowTool {
        started: Arc<AtomicUsize>,
        finished: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl grantscout_core::Tool for SlowTool {
        fn name(&self) -> &str {
            "search_grants"
        }

        fn description(&self) -> &str {
            "Slow grant search"
        }

        fn input_schema(&self) -> Value {
            json!({"type": "object"})
        }

        async fn execute(
            &self,
            _input: Value,
            _tier: &AccessTier,
        ) -> std::result::Result<Value, ToolError> {
            self.started.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(300)).await;
            self.finished.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"total": 0, "results": []}))
        }
    }

    #[tokio::test]
    async fn dropped_receiver_aborts_running_tools() {
        let started = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));
        let mut registry = grantscout_core::ToolRegistry::new();
        registry.register(Arc::new(SlowTool {
            started: Arc::clone(&started),
            finished: Arc::clone(&finished),
        }));

        let client = Arc::new(ScriptedModelClient::new(vec![
            tool_use_response(
                "",
                vec![
                    ("toolu_1", "search_grants", json!({"query": "ALS"})),
                    ("toolu_2", "search_grants", json!({"query": "SMA"})),
                ],
            ),
            text_response("unreachable"),
        ]));
        let invoker = ModelInvoker::new(
            client.clone(),
            Arc::new(CostTelemetry::new()),
            ModelSettings::default(),
        );
        let orchestrator = Arc::new(Orchestrator::new(
            invoker,
            ToolDispatcher::new(Arc::new(registry)),
            Arc::new(PersonaRegistry::builtin()),
        ));

        let mut rx = orchestrator.spawn(session("grants", "x"));
        assert_eq!(rx.recv().await.map(|f| f.event_type()), Some("tool_start"));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(started.load(Ordering::SeqCst), 2);
        drop(rx);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 0);
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn run_reports_summary() {
        let client = Arc::new(ScriptedModelClient::new(vec![
            tool_use_response("", vec![("toolu_1", "search_grants", json!({"query": "ALS"}))]),
            text_response("ok"),
        ]));
        let orchestrator = orchestrator(client);
        let mut session = session("grants", "x");
        let (mut sink, _rx) = FrameSink::channel();

        let summary = orchestrator.run(&mut session, &mut sink).await.unwrap();
        assert_eq!(summary.iterations, 2);
        assert_eq!(summary.tool_calls, 1);
        assert_eq!(summary.cause, StopCause::Completed);
        assert_eq!(summary.usage.input_tokens, 2400);
        assert_eq!(session.messages().len(), 3);
        assert!(!sink.is_terminated());
    }
}
