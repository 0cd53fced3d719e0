//! `grantscout chat`: Run one request in the terminal.

use grantscout_agent::{Frame, Session};
use grantscout_config::AppConfig;
use grantscout_core::access::resolve_or_degrade;
use grantscout_core::{CallerIdentity, ConversationMessage, RequestError};
use grantscout_gateway::bootstrap;
use grantscout_security::ConfiguredAccessResolver;
use grantscout_telemetry::CostTelemetry;
use grantscout_tools::{DataService, StaticDataService};
use std::sync::Arc;
use tracing::debug;

pub async fn run(
    persona: String,
    message: String,
    offline: bool,
    token: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set GRANTSCOUT_API_KEY or ANTHROPIC_API_KEY, or add it to:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let client = bootstrap::model_client(&config)?;
    let data: Arc<dyn DataService> = if offline {
        Arc::new(StaticDataService::sample())
    } else {
        bootstrap::data_service(&config.data)?
    };
    let telemetry = Arc::new(CostTelemetry::with_pricing(bootstrap::pricing(&config)));
    let orchestrator = Arc::new(bootstrap::orchestrator(
        &config,
        client,
        data,
        Arc::clone(&telemetry),
    ));

    if !orchestrator.personas().contains(&persona) {
        return Err(RequestError::UnknownPersona(persona).into());
    }

    let resolver = ConfiguredAccessResolver::from_config(&config.access);
    let identity = token.map(CallerIdentity::bearer).unwrap_or_default();
    let tier = resolve_or_degrade(&resolver, &identity).await;
    debug!(tier = %tier.tier, results_limit = tier.results_limit, "Resolved access tier");

    println!("[{persona} | tier: {}]", tier.tier);
    let session = Session::new(persona, tier, vec![ConversationMessage::user(message)]);
    let mut rx = orchestrator.spawn(session);

    let mut failed = None;
    while let Some(frame) = rx.recv().await {
        if let Frame::Error { message } = &frame {
            failed = Some(message.clone());
        }
        if let Some(line) = render_frame(&frame) {
            println!("{line}");
        }
    }

    let usage = telemetry.snapshot().total;
    println!(
        "\n[{} model call(s), {} in / {} out tokens, ${:.4}]",
        usage.calls, usage.input_tokens, usage.output_tokens, usage.cost_usd
    );

    match failed {
        Some(message) => Err(message.into()),
        None => Ok(()),
    }
}

/// One terminal line per frame; `None` for frames with nothing to show.
fn render_frame(frame: &Frame) -> Option<String> {
    match frame {
        Frame::ToolStart { tools } => Some(format!("> running: {}", tools.join(", "))),
        Frame::ToolResult {
            name,
            result,
            is_error,
            ..
        } => {
            if *is_error {
                let reason = result["error"].as_str().unwrap_or("unknown error");
                Some(format!("  x {name}: {reason}"))
            } else {
                let returned = result["returned"].as_u64().unwrap_or(0);
                let total = result["total"].as_u64().unwrap_or(returned);
                Some(format!("  - {name}: {returned} of {total} result(s)"))
            }
        }
        Frame::ToolComplete { .. } => None,
        Frame::Text { content } => Some(format!("\n{content}")),
        Frame::Error { message } => Some(format!("\nerror: {message}")),
        Frame::Done => None,
    }
}
