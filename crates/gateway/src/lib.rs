//! HTTP gateway for grantscout.
//!
//! Endpoints:
//!
//! - `POST /v1/chat`      : `{messages, persona}` in, `text/event-stream` of frames out
//! - `GET  /v1/personas`  : configured personas and their tool allow-lists
//! - `GET  /v1/tools`     : registered tools
//! - `GET  /v1/usage`     : running token and cost totals
//! - `GET  /health`       : liveness
//!
//! Built on Axum. All state is constructed once at startup and shared
//! read-only across requests.

pub mod bootstrap;
pub mod chat;
pub mod error;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, Method, header},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use grantscout_agent::Orchestrator;
use grantscout_config::{AppConfig, GatewayConfig};
use grantscout_core::{AccessResolver, CallerIdentity, Persona};
use grantscout_security::{AuditEvent, AuditLogger, AuditOutcome, TracingSink};
use grantscout_telemetry::{CostTelemetry, UsageSnapshot};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::ApiError;

/// Everything a request handler needs, built once at startup.
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub resolver: Arc<dyn AccessResolver>,
    pub telemetry: Arc<CostTelemetry>,
    pub audit: Arc<AuditLogger>,
    pub config: GatewayConfig,
    rate_limiter: RateLimiter,
    started_at: DateTime<Utc>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        resolver: Arc<dyn AccessResolver>,
        telemetry: Arc<CostTelemetry>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            orchestrator,
            resolver,
            telemetry,
            audit: Arc::new(AuditLogger::with_sinks(vec![Box::new(TracingSink)])),
            rate_limiter: RateLimiter::new(config.requests_per_minute, Duration::from_secs(60)),
            config,
            started_at: Utc::now(),
        }
    }

    pub fn with_audit(mut self, audit: Arc<AuditLogger>) -> Self {
        self.audit = audit;
        self
    }
}

/// The caller's identity from an `Authorization: Bearer` header.
pub fn caller_identity(headers: &HeaderMap) -> CallerIdentity {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(CallerIdentity::bearer)
        .unwrap_or_default()
}

/// Build the router with every route and layer.
pub fn build_router(state: SharedState) -> Router {
    let body_limit = state.config.body_limit_bytes;
    let cors = cors_layer(&state.config.allowed_origins);

    Router::new()
        .route("/health", get(health_handler))
        .route("/v1/chat", post(chat::chat_handler))
        .route("/v1/personas", get(personas_handler))
        .route("/v1/tools", get(tools_handler))
        .route("/v1/usage", get(usage_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            rate_limit_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins.iter().filter_map(|o| match o.parse() {
            Ok(origin) => Some(origin),
            Err(_) => {
                warn!(origin = %o, "Ignoring unparseable CORS origin");
                None
            }
        }))
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(3600))
}

/// Start the gateway HTTP server.
pub async fn start(config: &AppConfig, state: SharedState) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let app = build_router(state);

    info!(addr = %addr, model = %config.model.model, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Rate Limiter ---

/// In-memory sliding-window rate limiter keyed by resolved caller.
///
/// Thread-safe via `std::sync::Mutex` (non-async, held briefly).
struct RateLimiter {
    max_requests: usize,
    window: Duration,
    clients: Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests: max_requests as usize,
            window,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `true` if the request is allowed. A limit of zero disables limiting.
    fn check(&self, client_key: &str) -> bool {
        if self.max_requests == 0 {
            return true;
        }

        let now = Instant::now();
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());

        if clients.len() > 10_000 {
            clients.retain(|_, timestamps| {
                timestamps
                    .last()
                    .is_some_and(|t| now.duration_since(*t) < self.window)
            });
        }

        let timestamps = clients.entry(client_key.to_string()).or_default();
        timestamps.retain(|t| now.duration_since(*t) < self.window);

        if timestamps.len() >= self.max_requests {
            return false;
        }

        timestamps.push(now);
        true
    }
}

/// Bucket for a caller. Tokens that do not resolve share one bucket, so
/// rotating made-up tokens never yields a fresh window.
async fn rate_limit_key(resolver: &dyn AccessResolver, identity: &CallerIdentity) -> String {
    match identity.token.as_deref() {
        None => "anonymous".into(),
        Some(token) => match resolver.resolve(identity).await {
            Ok(_) => format!("token:{token}"),
            Err(_) => "unresolved".into(),
        },
    }
}

/// `/health` is exempt.
async fn rate_limit_middleware(
    State(state): State<SharedState>,
    req: axum::extract::Request,
    next: Next,
) -> Response {
    if req.uri().path() == "/health" {
        return next.run(req).await;
    }

    let identity = caller_identity(req.headers());
    let key = rate_limit_key(state.resolver.as_ref(), &identity).await;

    if !state.rate_limiter.check(&key) {
        warn!(path = %req.uri().path(), "Rate limit exceeded");
        state.audit.log(
            AuditEvent::RateLimited,
            &identity,
            AuditOutcome::Denied,
            Some(req.uri().path().to_string()),
        );
        return ApiError::rate_limited(state.config.requests_per_minute).into_response();
    }

    next.run(req).await
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    uptime_secs: i64,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
    })
}

#[derive(Serialize)]
struct PersonasResponse<'a> {
    personas: Vec<&'a Persona>,
    count: usize,
}

async fn personas_handler(State(state): State<SharedState>) -> Response {
    let personas = state.orchestrator.personas().list();
    Json(PersonasResponse {
        count: personas.len(),
        personas,
    })
    .into_response()
}

#[derive(Serialize)]
struct ToolInfo {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[derive(Serialize)]
struct ToolsResponse {
    tools: Vec<ToolInfo>,
    count: usize,
}

async fn tools_handler(State(state): State<SharedState>) -> Json<ToolsResponse> {
    let tools: Vec<ToolInfo> = state
        .orchestrator
        .dispatcher()
        .registry()
        .schemas()
        .into_iter()
        .map(|s| ToolInfo {
            name: s.name,
            description: s.description,
            input_schema: s.input_schema,
        })
        .collect();
    Json(ToolsResponse {
        count: tools.len(),
        tools,
    })
}

#[derive(Serialize)]
struct UsageResponse {
    #[serde(flatten)]
    snapshot: UsageSnapshot,
    cache_hit_ratio: f64,
}

async fn usage_handler(State(state): State<SharedState>) -> Json<UsageResponse> {
    let snapshot = state.telemetry.snapshot();
    Json(UsageResponse {
        cache_hit_ratio: snapshot.cache_hit_ratio(),
        snapshot,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use grantscout_agent::test_helpers::{ScriptedModelClient, text_response, tool_use_response};
    use grantscout_agent::{ModelInvoker, ModelSettings};
    use grantscout_config::AccessConfig;
    use grantscout_core::PersonaRegistry;
    use grantscout_security::ConfiguredAccessResolver;
    use grantscout_tools::{StaticDataService, ToolDispatcher, default_registry};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn test_state_with(client: Arc<ScriptedModelClient>, gateway: GatewayConfig) -> SharedState {
        let telemetry = Arc::new(CostTelemetry::new());
        let invoker = ModelInvoker::new(client, Arc::clone(&telemetry), ModelSettings::default());
        let registry = default_registry(Arc::new(StaticDataService::sample()));
        let orchestrator = Arc::new(Orchestrator::new(
            invoker,
            ToolDispatcher::new(Arc::new(registry)),
            Arc::new(PersonaRegistry::builtin()),
        ));

        let mut access = AccessConfig::default();
        access.tokens.insert("sk-enterprise".into(), "enterprise".into());
        let resolver = Arc::new(ConfiguredAccessResolver::from_config(&access));

        Arc::new(
            AppState::new(orchestrator, resolver, telemetry, gateway)
                .with_audit(Arc::new(AuditLogger::new())),
        )
    }

    fn test_state(client: Arc<ScriptedModelClient>) -> SharedState {
        test_state_with(client, GatewayConfig::default())
    }

    fn chat_request(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/v1/chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let app = build_router(test_state(Arc::new(ScriptedModelClient::new(vec![]))));

        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn chat_streams_frames_and_sentinel() {
        let client = Arc::new(ScriptedModelClient::new(vec![
            tool_use_response("", vec![("toolu_1", "search_grants", json!({"query": "ALS"}))]),
            text_response("Here are the grants."),
        ]));
        let app = build_router(test_state(Arc::clone(&client)));

        let response = app
            .oneshot(chat_request(json!({
                "persona": "grants",
                "messages": [{"role": "user", "content": "ALS grants"}]
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );

        let body = body_string(response).await;
        let start = body.find("event: tool_start").unwrap();
        let result = body.find("event: tool_result").unwrap();
        let complete = body.find("event: tool_complete").unwrap();
        let text = body.find("event: text").unwrap();
        let done = body.find("data: [DONE]").unwrap();
        assert!(start < result && result < complete && complete < text && text < done);
        assert!(!body.contains("event: error"));
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn missing_persona_is_rejected_before_model_call() {
        let client = Arc::new(ScriptedModelClient::new(vec![text_response("never")]));
        let state = test_state(Arc::clone(&client));
        let app = build_router(Arc::clone(&state));

        let response = app
            .oneshot(chat_request(json!({
                "messages": [{"role": "user", "content": "ALS grants"}]
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["error"]["kind"], "missing_field");
        assert_eq!(client.call_count(), 0);
        assert_eq!(state.audit.entries_by_outcome(&AuditOutcome::Denied).len(), 1);
    }

    #[tokio::test]
    async fn unknown_persona_is_400() {
        let client = Arc::new(ScriptedModelClient::new(vec![text_response("never")]));
        let app = build_router(test_state(Arc::clone(&client)));

        let response = app
            .oneshot(chat_request(json!({
                "persona": "astrology",
                "messages": [{"role": "user", "content": "hi"}]
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["error"]["kind"], "unknown_persona");
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn invalid_json_is_400() {
        let app = build_router(test_state(Arc::new(ScriptedModelClient::new(vec![]))));
        let req = Request::builder()
            .method("POST")
            .uri("/v1/chat")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["error"]["kind"], "invalid_body");
    }

    #[tokio::test]
    async fn model_failure_streams_error_frame() {
        let client = Arc::new(ScriptedModelClient::from_results(vec![Err(
            grantscout_core::ModelError::AuthenticationFailed("bad key".into()),
        )]));
        let app = build_router(test_state(client));

        let response = app
            .oneshot(chat_request(json!({
                "persona": "general",
                "messages": [{"role": "user", "content": "hi"}]
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains("event: error"));
        assert!(!body.contains("[DONE]"));
    }

    #[tokio::test]
    async fn bearer_token_selects_tier() {
        let client = Arc::new(ScriptedModelClient::new(vec![text_response("ok")]));
        let state = test_state(client);
        let app = build_router(Arc::clone(&state));

        let mut req = chat_request(json!({
            "persona": "general",
            "messages": [{"role": "user", "content": "hi"}]
        }));
        req.headers_mut()
            .insert(header::AUTHORIZATION, "Bearer sk-enterprise".parse().unwrap());
        let response = app.oneshot(req).await.unwrap();
        body_string(response).await;

        let entries = state.audit.entries();
        assert_eq!(
            entries[0].event,
            AuditEvent::TierResolved {
                tier: "enterprise".into()
            }
        );
    }

    #[tokio::test]
    async fn rate_limit_returns_429() {
        let gateway = GatewayConfig {
            requests_per_minute: 1,
            ..GatewayConfig::default()
        };
        let app = build_router(test_state_with(
            Arc::new(ScriptedModelClient::new(vec![])),
            gateway,
        ));

        let first = app
            .clone()
            .oneshot(Request::builder().uri("/v1/tools").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app
            .clone()
            .oneshot(Request::builder().uri("/v1/tools").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        let json: Value = serde_json::from_str(&body_string(second).await).unwrap();
        assert_eq!(json["error"]["kind"], "rate_limited");

        // Health stays reachable.
        let health = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(health.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_tokens_share_one_rate_limit_bucket() {
        let gateway = GatewayConfig {
            requests_per_minute: 1,
            ..GatewayConfig::default()
        };
        let app = build_router(test_state_with(
            Arc::new(ScriptedModelClient::new(vec![])),
            gateway,
        ));
        let tools = |token: &str| {
            Request::builder()
                .uri("/v1/tools")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap()
        };

        let first = app.clone().oneshot(tools("sk-made-up-1")).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let rotated = app.clone().oneshot(tools("sk-made-up-2")).await.unwrap();
        assert_eq!(rotated.status(), StatusCode::TOO_MANY_REQUESTS);

        // A known token keeps its own window.
        let known = app.oneshot(tools("sk-enterprise")).await.unwrap();
        assert_eq!(known.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn list_tools_and_personas() {
        let app = build_router(test_state(Arc::new(ScriptedModelClient::new(vec![]))));

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/v1/tools").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["count"], 5);
        assert!(json["tools"].as_array().unwrap().iter().any(|t| t["name"] == "search_clinical_trials"));

        let response = app
            .oneshot(Request::builder().uri("/v1/personas").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["count"], 5);
    }

    #[tokio::test]
    async fn usage_reflects_model_calls() {
        let client = Arc::new(ScriptedModelClient::new(vec![text_response("ok")]));
        let app = build_router(test_state(client));

        let response = app
            .clone()
            .oneshot(chat_request(json!({
                "persona": "general",
                "messages": [{"role": "user", "content": "hi"}]
            })))
            .await
            .unwrap();
        body_string(response).await;

        let response = app
            .oneshot(Request::builder().uri("/v1/usage").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["total"]["calls"], 1);
        assert!(json["total"]["cost_usd"].as_f64().unwrap() > 0.0);
    }

    #[test]
    fn identity_from_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(caller_identity(&headers), CallerIdentity::anonymous());
        headers.insert(header::AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert_eq!(caller_identity(&headers), CallerIdentity::bearer("abc"));
        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(caller_identity(&headers), CallerIdentity::anonymous());
    }
}
