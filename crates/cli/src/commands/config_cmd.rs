//! `grantscout config`: Configuration display commands.

use grantscout_config::AppConfig;

/// Print the built-in defaults as TOML.
pub fn default() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", AppConfig::default_toml());
    Ok(())
}

/// Print the resolved config with secrets removed.
pub fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    println!("{}", toml::to_string_pretty(&without_secrets(config))?);
    Ok(())
}

pub fn path() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", config_path().display());
    Ok(())
}

fn config_path() -> std::path::PathBuf {
    AppConfig::config_dir().join("config.toml")
}

fn without_secrets(mut config: AppConfig) -> AppConfig {
    config.model.api_key = None;
    config.data.api_key = None;
    // Token values are secrets; keep only which tiers are in use.
    let tokens = std::mem::take(&mut config.access.tokens);
    config.access.tokens = tokens
        .into_values()
        .enumerate()
        .map(|(i, tier)| (format!("token_{}", i + 1), tier))
        .collect();
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_is_valid() {
        assert!(config_path().to_str().unwrap().ends_with("config.toml"));
    }

    #[test]
    fn secrets_are_stripped() {
        let mut config = AppConfig::default();
        config.model.api_key = Some("sk-ant-secret".into());
        config.data.api_key = Some("data-secret".into());
        config.access.tokens.insert("sk-live-abc".into(), "pro".into());

        let rendered = toml::to_string_pretty(&without_secrets(config)).unwrap();
        assert!(!rendered.contains("sk-ant-secret"));
        assert!(!rendered.contains("data-secret"));
        assert!(!rendered.contains("sk-live-abc"));
        assert!(rendered.contains("token_1 = \"pro\""));
    }
}
