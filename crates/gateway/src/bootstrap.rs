//! Wiring of the runtime from an [`AppConfig`].
//!
//! Builds every collaborator exactly once: model client, data service, tool
//! registry, personas, pricing, orchestrator and access resolver.

use grantscout_agent::{ModelInvoker, ModelSettings, Orchestrator, OrchestratorSettings};
use grantscout_config::{AppConfig, DataConfig};
use grantscout_core::{ModelClient, PersonaRegistry, Result};
use grantscout_providers::AnthropicClient;
use grantscout_security::ConfiguredAccessResolver;
use grantscout_telemetry::{CostTelemetry, PricingTable, TokenRates};
use grantscout_tools::{DataService, HttpDataService, StaticDataService, Summarizer, ToolDispatcher};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::{AppState, SharedState};

/// The configured model backend.
pub fn model_client(config: &AppConfig) -> Result<Arc<dyn ModelClient>> {
    Ok(Arc::new(AnthropicClient::from_config(&config.model)?))
}

/// The data service behind the search tools. Without a `base_url` the
/// built-in sample data is used.
pub fn data_service(config: &DataConfig) -> Result<Arc<dyn DataService>> {
    match &config.base_url {
        Some(url) => {
            info!(url = %url, "Using HTTP data service");
            Ok(Arc::new(HttpDataService::new(
                url.clone(),
                config.api_key.clone(),
                Duration::from_secs(config.timeout_secs),
            )?))
        }
        None => {
            warn!("No data.base_url configured, serving built-in sample data");
            Ok(Arc::new(StaticDataService::sample()))
        }
    }
}

/// Built-in personas with config entries layered on top.
pub fn personas(config: &AppConfig) -> PersonaRegistry {
    let mut registry = PersonaRegistry::builtin();
    for persona in &config.personas {
        registry.insert(persona.clone());
    }
    registry
}

/// Built-in pricing with config overrides applied.
pub fn pricing(config: &AppConfig) -> PricingTable {
    let table = PricingTable::with_defaults();
    for (model, p) in &config.pricing {
        let defaults = TokenRates::new(p.input_per_m, p.output_per_m);
        table.set(
            model.clone(),
            TokenRates::explicit(
                p.input_per_m,
                p.output_per_m,
                p.cache_read_per_m.unwrap_or(defaults.cache_read_per_m),
                p.cache_write_per_m.unwrap_or(defaults.cache_write_per_m),
            ),
        );
    }
    table
}

/// Assemble the orchestrator and its collaborators.
pub fn orchestrator(
    config: &AppConfig,
    client: Arc<dyn ModelClient>,
    data: Arc<dyn DataService>,
    telemetry: Arc<CostTelemetry>,
) -> Orchestrator {
    let registry = grantscout_tools::default_registry(data);
    let dispatcher = ToolDispatcher::new(Arc::new(registry))
        .with_timeout(Duration::from_secs(config.orchestrator.tool_timeout_secs))
        .with_summarizer(Summarizer::new(config.orchestrator.summary_string_limit));
    let invoker = ModelInvoker::new(client, telemetry, ModelSettings::from_config(&config.model));

    Orchestrator::new(invoker, dispatcher, Arc::new(personas(config)))
        .with_settings(OrchestratorSettings::from_config(&config.orchestrator))
}

/// Full gateway state from config plus an injected model client and data service.
pub fn build_state(
    config: &AppConfig,
    client: Arc<dyn ModelClient>,
    data: Arc<dyn DataService>,
) -> SharedState {
    let telemetry = Arc::new(CostTelemetry::with_pricing(pricing(config)));
    let orchestrator = Arc::new(orchestrator(config, client, data, Arc::clone(&telemetry)));
    let resolver = Arc::new(ConfiguredAccessResolver::from_config(&config.access));

    Arc::new(AppState::new(
        orchestrator,
        resolver,
        telemetry,
        config.gateway.clone(),
    ))
}
