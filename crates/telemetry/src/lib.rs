//! Cost tracking for grantscout.
//!
//! Every successful model call is priced from its four token classes
//! (uncached input, cache read, cache write, output), logged, and folded
//! into running totals served by the usage endpoint.

pub mod engine;
pub mod model;
pub mod pricing;

pub use engine::CostTelemetry;
pub use model::{ModelUsage, UsageRecord, UsageSnapshot};
pub use pricing::{PricingTable, TokenRates, cost};

/// Errors from the telemetry subsystem.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("no pricing for model: {0}")]
    UnknownModel(String),
}
