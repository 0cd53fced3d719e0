//! `grantscout doctor`: Diagnose configuration.

use grantscout_config::AppConfig;
use grantscout_gateway::bootstrap;
use grantscout_security::ConfiguredAccessResolver;
use grantscout_tools::{StaticDataService, default_registry};
use std::sync::Arc;

#[derive(Debug, PartialEq, Eq)]
enum Status {
    Ok,
    Warn,
    Fail,
}

#[derive(Debug)]
struct Check {
    status: Status,
    message: String,
}

impl Check {
    fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("grantscout doctor");
    println!("=================\n");

    let config_path = AppConfig::config_dir().join("config.toml");
    let mut checks = Vec::new();

    if config_path.exists() {
        checks.push(Check::new(
            Status::Ok,
            format!("Config file found at {}", config_path.display()),
        ));
    } else {
        checks.push(Check::new(
            Status::Warn,
            "No config file; defaults in use (`grantscout config > ~/.grantscout/config.toml`)",
        ));
    }

    match AppConfig::load() {
        Ok(config) => {
            checks.push(Check::new(Status::Ok, "Config valid"));
            checks.extend(diagnose(&config));
        }
        Err(e) => checks.push(Check::new(Status::Fail, format!("Config invalid: {e}"))),
    }

    let mut issues = 0;
    for check in &checks {
        let mark = match check.status {
            Status::Ok => "ok  ",
            Status::Warn => "warn",
            Status::Fail => {
                issues += 1;
                "FAIL"
            }
        };
        println!("  [{mark}] {}", check.message);
    }

    println!();
    if issues == 0 {
        println!("  All required checks passed.");
        Ok(())
    } else {
        Err(format!("{issues} check(s) failed").into())
    }
}

/// Checks that need a parsed config.
fn diagnose(config: &AppConfig) -> Vec<Check> {
    let mut checks = Vec::new();

    if config.has_api_key() {
        checks.push(Check::new(Status::Ok, "Model API key configured"));
    } else {
        checks.push(Check::new(
            Status::Fail,
            "No model API key: set GRANTSCOUT_API_KEY or ANTHROPIC_API_KEY",
        ));
    }

    match &config.data.base_url {
        Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
            checks.push(Check::new(Status::Ok, format!("Data service: {url}")));
        }
        Some(url) => checks.push(Check::new(
            Status::Fail,
            format!("Data service URL is not http(s): {url}"),
        )),
        None => checks.push(Check::new(
            Status::Warn,
            "No data.base_url: tools will serve built-in sample data",
        )),
    }

    let registry = default_registry(Arc::new(StaticDataService::new()));
    for persona in bootstrap::personas(config).list() {
        let unknown: Vec<&str> = persona
            .tools
            .iter()
            .map(String::as_str)
            .filter(|t| !registry.contains(t))
            .collect();
        if !unknown.is_empty() {
            checks.push(Check::new(
                Status::Fail,
                format!(
                    "Persona '{}' allows unknown tool(s): {}",
                    persona.name,
                    unknown.join(", ")
                ),
            ));
        }
    }

    let resolver = ConfiguredAccessResolver::from_config(&config.access);
    for name in [&config.access.anonymous_tier, &config.access.fallback_tier] {
        if resolver.tier(name).is_none() {
            checks.push(Check::new(
                Status::Fail,
                format!("Access tier '{name}' is not defined"),
            ));
        }
    }
    for tier in config.access.tokens.values() {
        if resolver.tier(tier).is_none() {
            checks.push(Check::new(
                Status::Warn,
                format!("A token maps to undefined tier '{tier}'; its callers will be degraded"),
            ));
        }
    }

    checks
}
