//! Thread-safe cost telemetry: prices each model call, logs it, and keeps
//! running totals for the usage endpoint.

use crate::model::{ModelUsage, UsageRecord, UsageSnapshot};
use crate::pricing::{PricingTable, cost};
use chrono::Utc;
use grantscout_core::TokenUsage;
use std::sync::RwLock;

/// Records usage for every successful model call.
///
/// Accounting never affects control flow: an unpriced model is recorded at
/// zero cost with a warning.
pub struct CostTelemetry {
    pricing: PricingTable,
    totals: RwLock<UsageSnapshot>,
}

impl CostTelemetry {
    /// Create a telemetry engine with default pricing.
    pub fn new() -> Self {
        Self::with_pricing(PricingTable::with_defaults())
    }

    /// Create a telemetry engine with custom pricing.
    pub fn with_pricing(pricing: PricingTable) -> Self {
        Self {
            pricing,
            totals: RwLock::new(UsageSnapshot::default()),
        }
    }

    pub fn pricing(&self) -> &PricingTable {
        &self.pricing
    }

    /// Price one call, emit it as a log event, and fold it into the totals.
    pub fn record(&self, model: &str, usage: &TokenUsage) -> UsageRecord {
        let estimated_cost = match self.pricing.rates_for(model) {
            Ok(rates) => cost(&rates, usage),
            Err(e) => {
                tracing::warn!(model = %model, error = %e, "No pricing for model, recording zero cost");
                0.0
            }
        };

        let record = UsageRecord {
            model: model.to_string(),
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            cache_read_tokens: usage.cache_read_tokens,
            cache_write_tokens: usage.cache_write_tokens,
            estimated_cost,
            recorded_at: Utc::now(),
        };

        tracing::info!(
            model = %record.model,
            input_tokens = record.input_tokens,
            output_tokens = record.output_tokens,
            cache_read_tokens = record.cache_read_tokens,
            cache_write_tokens = record.cache_write_tokens,
            cost_usd = record.estimated_cost,
            "Model usage"
        );

        let mut totals = self.totals.write().unwrap_or_else(|e| e.into_inner());
        totals.since.get_or_insert(record.recorded_at);
        totals.total.add(&record);
        totals
            .by_model
            .entry(record.model.clone())
            .or_insert_with(ModelUsage::default)
            .add(&record);

        record
    }

    /// Get a real-time usage snapshot.
    pub fn snapshot(&self) -> UsageSnapshot {
        self.totals.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Default for CostTelemetry {
    fn default() -> Self {
        Self::new()
    }
}
