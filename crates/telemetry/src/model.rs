//! Data model for usage accounting: per-call records and running totals.

use chrono::{DateTime, Utc};
use grantscout_core::TokenUsage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Accounting for one successful model call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub cache_read_tokens: u32,
    pub cache_write_tokens: u32,
    /// Estimated cost in USD.
    pub estimated_cost: f64,
    pub recorded_at: DateTime<Utc>,
}

impl UsageRecord {
    pub fn usage(&self) -> TokenUsage {
        TokenUsage {
            input_tokens: self.input_tokens,
            output_tokens: self.output_tokens,
            cache_read_tokens: self.cache_read_tokens,
            cache_write_tokens: self.cache_write_tokens,
        }
    }
}

/// Totals for a single model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelUsage {
    pub calls: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read_tokens: u64,
    pub cache_write_tokens: u64,
    pub cost_usd: f64,
}

impl ModelUsage {
    pub(crate) fn add(&mut self, record: &UsageRecord) {
        self.calls += 1;
        self.input_tokens += record.input_tokens as u64;
        self.output_tokens += record.output_tokens as u64;
        self.cache_read_tokens += record.cache_read_tokens as u64;
        self.cache_write_tokens += record.cache_write_tokens as u64;
        self.cost_usd += record.estimated_cost;
    }
}

/// Point-in-time view of everything recorded since startup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    /// Totals across all models.
    pub total: ModelUsage,
    /// Totals keyed by the model that responded.
    pub by_model: BTreeMap<String, ModelUsage>,
    /// When the first call was recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<DateTime<Utc>>,
}

impl UsageSnapshot {
    /// Share of prompt tokens served from the cache, 0.0 when nothing was recorded.
    pub fn cache_hit_ratio(&self) -> f64 {
        let prompt = self.total.input_tokens + self.total.cache_read_tokens + self.total.cache_write_tokens;
        if prompt == 0 {
            return 0.0;
        }
        self.total.cache_read_tokens as f64 / prompt as f64
    }
}
