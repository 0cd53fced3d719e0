//! `grantscout personas`: List personas and their tool allow-lists.

use grantscout_config::AppConfig;
use grantscout_gateway::bootstrap;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let registry = bootstrap::personas(&config);

    println!("{} persona(s)\n", registry.len());
    for persona in registry.list() {
        println!("  {:<14} {}", persona.name, persona.description);
        println!("  {:<14} tools: {}", "", persona.tools.join(", "));
    }

    Ok(())
}
