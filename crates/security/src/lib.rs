//! Caller access control for grantscout.
//!
//! Provides:
//! - **Access resolution**: bearer token → tier name → [`AccessTier`] policy,
//!   degrading to a fallback tier whenever resolution fails
//! - **Audit logging**: structured records of every access decision
//!
//! [`AccessTier`]: grantscout_core::AccessTier

pub mod access;
pub mod audit;

pub use access::{ConfiguredAccessResolver, builtin_tiers, resolve_audited};
pub use audit::{AuditEntry, AuditEvent, AuditLogger, AuditOutcome, AuditSink, TracingSink};
