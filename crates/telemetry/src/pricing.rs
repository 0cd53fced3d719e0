//! Built-in pricing table for Anthropic models.
//!
//! Prices are in USD per 1 million tokens, split by billing class:
//! uncached input, cache read, cache write, and output. Custom pricing can
//! be added at runtime via TOML config.

use grantscout_core::TokenUsage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::TelemetryError;

/// Cache reads bill at a tenth of the input rate.
pub const CACHE_READ_MULTIPLIER: f64 = 0.1;
/// Cache writes bill at a quarter above the input rate.
pub const CACHE_WRITE_MULTIPLIER: f64 = 1.25;

/// Per-million-token pricing for a model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TokenRates {
    /// Price per 1M uncached input tokens in USD.
    pub input_per_m: f64,
    /// Price per 1M output tokens in USD.
    pub output_per_m: f64,
    /// Price per 1M tokens read from the prompt cache.
    pub cache_read_per_m: f64,
    /// Price per 1M tokens written to the prompt cache.
    pub cache_write_per_m: f64,
}

impl TokenRates {
    /// Rates with the standard cache multipliers derived from the input price.
    pub fn new(input_per_m: f64, output_per_m: f64) -> Self {
        Self {
            input_per_m,
            output_per_m,
            cache_read_per_m: input_per_m * CACHE_READ_MULTIPLIER,
            cache_write_per_m: input_per_m * CACHE_WRITE_MULTIPLIER,
        }
    }

    /// Fully explicit rates.
    pub fn explicit(
        input_per_m: f64,
        output_per_m: f64,
        cache_read_per_m: f64,
        cache_write_per_m: f64,
    ) -> Self {
        Self {
            input_per_m,
            output_per_m,
            cache_read_per_m,
            cache_write_per_m,
        }
    }

    pub fn zero() -> Self {
        Self::explicit(0.0, 0.0, 0.0, 0.0)
    }
}

/// Estimated cost of one call in USD.
pub fn cost(rates: &TokenRates, usage: &TokenUsage) -> f64 {
    (usage.input_tokens as f64 * rates.input_per_m
        + usage.output_tokens as f64 * rates.output_per_m
        + usage.cache_read_tokens as f64 * rates.cache_read_per_m
        + usage.cache_write_tokens as f64 * rates.cache_write_per_m)
        / 1_000_000.0
}

/// Thread-safe pricing table with built-in defaults and custom overrides.
pub struct PricingTable {
    prices: RwLock<HashMap<String, TokenRates>>,
}

impl PricingTable {
    /// Create a pricing table with built-in model prices.
    pub fn with_defaults() -> Self {
        let mut prices = HashMap::new();

        prices.insert("claude-opus-4".into(), TokenRates::new(15.0, 75.0));
        prices.insert("claude-sonnet-4".into(), TokenRates::new(3.0, 15.0));
        prices.insert("claude-3-7-sonnet".into(), TokenRates::new(3.0, 15.0));
        prices.insert("claude-3-5-sonnet".into(), TokenRates::new(3.0, 15.0));
        prices.insert("claude-3-5-haiku".into(), TokenRates::new(0.8, 4.0));
        prices.insert("claude-3-haiku".into(), TokenRates::new(0.25, 1.25));
        prices.insert("claude-3-opus".into(), TokenRates::new(15.0, 75.0));

        Self {
            prices: RwLock::new(prices),
        }
    }

    /// Create an empty pricing table.
    pub fn empty() -> Self {
        Self {
            prices: RwLock::new(HashMap::new()),
        }
    }

    /// Add or update pricing for a model.
    pub fn set(&self, model: impl Into<String>, rates: TokenRates) {
        let mut prices = self.prices.write().unwrap_or_else(|e| e.into_inner());
        prices.insert(model.into(), rates);
    }

    /// Look up rates for a model.
    ///
    /// Tries an exact match first, then the longest key that is a prefix of
    /// the model name (`claude-sonnet-4-20250514` matches `claude-sonnet-4`).
    pub fn rates_for(&self, model: &str) -> Result<TokenRates, TelemetryError> {
        let prices = self.prices.read().unwrap_or_else(|e| e.into_inner());

        if let Some(rates) = prices.get(model) {
            return Ok(*rates);
        }

        let model_lower = model.to_lowercase();
        let bare_model = model_lower.rsplit('/').next().unwrap_or(&model_lower);

        prices
            .iter()
            .filter(|(key, _)| bare_model.starts_with(&key.to_lowercase()))
            .max_by_key(|(key, _)| key.len())
            .map(|(_, rates)| *rates)
            .ok_or_else(|| TelemetryError::UnknownModel(model.to_string()))
    }

    /// Compute cost for a model call, returning 0.0 if the model is not in the table.
    pub fn compute_cost(&self, model: &str, usage: &TokenUsage) -> f64 {
        self.rates_for(model)
            .map(|rates| cost(&rates, usage))
            .unwrap_or(0.0)
    }

    /// List all known model names.
    pub fn models(&self) -> Vec<String> {
        let prices = self.prices.read().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<String> = prices.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of models in the pricing table.
    pub fn len(&self) -> usize {
        self.prices.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}
