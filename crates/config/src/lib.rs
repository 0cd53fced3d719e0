//! Configuration loading, validation, and management for grantscout.
//!
//! Loads configuration from `~/.grantscout/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use grantscout_core::Persona;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.grantscout/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Text-generation backend settings
    #[serde(default)]
    pub model: ModelConfig,

    /// Iteration loop settings
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// HTTP gateway settings
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Tool-backing data service
    #[serde(default)]
    pub data: DataConfig,

    /// Caller identity to tier mapping
    #[serde(default)]
    pub access: AccessConfig,

    /// Persona overrides and additions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub personas: Vec<Persona>,

    /// Custom per-million-token pricing (model name → rates)
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub pricing: HashMap<String, PricingOverrideConfig>,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Mark system prompt and tool schemas as cacheable prefixes
    #[serde(default = "default_true")]
    pub prompt_caching: bool,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_api_url() -> String {
    "https://api.anthropic.com".into()
}
fn default_model() -> String {
    "claude-sonnet-4-20250514".into()
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_temperature() -> f32 {
    0.2
}
fn default_request_timeout() -> u64 {
    120
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            prompt_caching: true,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("prompt_caching", &self.prompt_caching)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// Whether prose on intermediate tool-calling turns reaches the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntermediateText {
    /// Only the terminal turn's prose is streamed.
    #[default]
    Suppress,
    /// Prose accompanying tool calls is streamed before `tool_start`.
    Emit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum model invocations per request
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Per-tool execution bound
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,

    #[serde(default)]
    pub intermediate_text: IntermediateText,

    /// Appended once when the final turn stops on `max_tokens`
    #[serde(default = "default_truncation_notice")]
    pub truncation_notice: String,

    /// Strings longer than this are truncated in model-facing tool results
    #[serde(default = "default_summary_string_limit")]
    pub summary_string_limit: usize,
}

fn default_max_iterations() -> u32 {
    5
}
fn default_tool_timeout() -> u64 {
    30
}
fn default_truncation_notice() -> String {
    "\n\n[Response truncated: the answer reached the maximum length. Ask a narrower question for more detail.]".into()
}
fn default_summary_string_limit() -> usize {
    500
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            tool_timeout_secs: default_tool_timeout(),
            intermediate_text: IntermediateText::default(),
            truncation_notice: default_truncation_notice(),
            summary_string_limit: default_summary_string_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Per-caller sliding window (0 disables limiting)
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,

    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,

    /// CORS origins; empty allows any origin
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_port() -> u16 {
    8787
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_requests_per_minute() -> u32 {
    60
}
fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            requests_per_minute: default_requests_per_minute(),
            body_limit_bytes: default_body_limit(),
            allowed_origins: vec![],
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// REST endpoint of the data service; `None` means offline sample data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_data_timeout")]
    pub timeout_secs: u64,
}

fn default_data_timeout() -> u64 {
    20
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            timeout_secs: default_data_timeout(),
        }
    }
}

impl std::fmt::Debug for DataConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// One tier definition under `[access.tiers.<name>]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierConfig {
    pub results_limit: u32,

    #[serde(default)]
    pub can_export: bool,

    #[serde(default)]
    pub can_see_emails: bool,

    #[serde(default)]
    pub can_see_abstracts: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quota: Option<u32>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Tier for callers without a bearer token
    #[serde(default = "default_anonymous_tier")]
    pub anonymous_tier: String,

    /// Tier for callers whose token cannot be resolved
    #[serde(default = "default_fallback_tier")]
    pub fallback_tier: String,

    /// Bearer token → tier name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tokens: BTreeMap<String, String>,

    /// Tier definitions; merged over the built-in tiers
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tiers: BTreeMap<String, TierConfig>,
}

fn default_anonymous_tier() -> String {
    "free".into()
}
fn default_fallback_tier() -> String {
    "restricted".into()
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            anonymous_tier: default_anonymous_tier(),
            fallback_tier: default_fallback_tier(),
            tokens: BTreeMap::new(),
            tiers: BTreeMap::new(),
        }
    }
}

impl std::fmt::Debug for AccessConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tokens: Vec<(&str, &str)> = self
            .tokens
            .values()
            .map(|tier| ("[REDACTED]", tier.as_str()))
            .collect();
        f.debug_struct("AccessConfig")
            .field("anonymous_tier", &self.anonymous_tier)
            .field("fallback_tier", &self.fallback_tier)
            .field("tokens", &tokens)
            .field("tiers", &self.tiers)
            .finish()
    }
}

/// Custom per-million-token pricing for a model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingOverrideConfig {
    /// Price per 1M uncached input tokens in USD
    pub input_per_m: f64,
    /// Price per 1M output tokens in USD
    pub output_per_m: f64,
    /// Defaults to 0.1 × input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_read_per_m: Option<f64>,
    /// Defaults to 1.25 × input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_write_per_m: Option<f64>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.grantscout/config.toml).
    ///
    /// Also checks environment variables:
    /// - `GRANTSCOUT_API_KEY` (highest priority), then `ANTHROPIC_API_KEY`
    /// - `GRANTSCOUT_MODEL`
    /// - `GRANTSCOUT_DATA_URL`, `GRANTSCOUT_DATA_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("GRANTSCOUT_API_KEY").or_else(|| lookup("ANTHROPIC_API_KEY")) {
            self.model.api_key = Some(key);
        }
        if let Some(model) = lookup("GRANTSCOUT_MODEL") {
            self.model.model = model;
        }
        if let Some(url) = lookup("GRANTSCOUT_DATA_URL") {
            self.data.base_url = Some(url);
        }
        if let Some(key) = lookup("GRANTSCOUT_DATA_KEY") {
            self.data.api_key = Some(key);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".grantscout")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.model.temperature) {
            return Err(ConfigError::ValidationError(
                "model.temperature must be between 0.0 and 1.0".into(),
            ));
        }

        if self.model.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "model.max_tokens must be > 0".into(),
            ));
        }

        if self.orchestrator.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "orchestrator.max_iterations must be >= 1".into(),
            ));
        }

        if self.orchestrator.tool_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "orchestrator.tool_timeout_secs must be > 0".into(),
            ));
        }

        if self.orchestrator.summary_string_limit == 0 {
            return Err(ConfigError::ValidationError(
                "orchestrator.summary_string_limit must be > 0".into(),
            ));
        }

        if self.gateway.body_limit_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "gateway.body_limit_bytes must be > 0".into(),
            ));
        }

        for (name, tier) in &self.access.tiers {
            if tier.results_limit == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "access.tiers.{name}.results_limit must be > 0"
                )));
            }
        }

        for persona in &self.personas {
            if persona.name.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "personas: name must not be empty".into(),
                ));
            }
            if persona.system_prompt.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "personas.{}: system_prompt must not be empty",
                    persona.name
                )));
            }
        }

        for (model, rates) in &self.pricing {
            let all = [
                Some(rates.input_per_m),
                Some(rates.output_per_m),
                rates.cache_read_per_m,
                rates.cache_write_per_m,
            ];
            if all.iter().flatten().any(|r| *r < 0.0) {
                return Err(ConfigError::ValidationError(format!(
                    "pricing.{model}: rates must be >= 0"
                )));
            }
        }

        Ok(())
    }

    /// Check if a model API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.model.api_key.is_some()
    }

    /// Generate a default config TOML string (for the `config` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
