//! `grantscout serve`: Start the HTTP gateway.

use grantscout_config::AppConfig;
use grantscout_gateway::bootstrap;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    let client = bootstrap::model_client(&config)?;
    let data = bootstrap::data_service(&config.data)?;
    let state = bootstrap::build_state(&config, client, data);

    println!("grantscout gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Model:     {}", config.model.model);
    println!(
        "   Data:      {}",
        config.data.base_url.as_deref().unwrap_or("built-in sample data")
    );
    println!("   Personas:  {}", state.orchestrator.personas().len());

    grantscout_gateway::start(&config, state).await?;

    Ok(())
}
