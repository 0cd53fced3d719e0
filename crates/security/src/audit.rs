//! Audit trail for access decisions.
//!
//! Records tier resolution, degradation, rate limiting and rejected requests.
//! Entries are kept in a bounded in-memory buffer and forwarded to sinks.

use chrono::{DateTime, Utc};
use grantscout_core::CallerIdentity;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Entries retained in memory.
pub const DEFAULT_CAPACITY: usize = 1024;

/// A single audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub event: AuditEvent,
    /// Masked caller label, never the raw token.
    pub actor: String,
    pub outcome: AuditOutcome,
    pub details: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// A caller was mapped to a tier
    TierResolved { tier: String },
    /// Resolution failed and the caller got the fallback tier
    TierDegraded { tier: String },
    /// The caller exceeded its request rate
    RateLimited,
    /// The request body failed validation
    RequestRejected { kind: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Degraded,
    Denied,
}

/// Where audit entries are written.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: &AuditEntry);
}

/// Logs entries via `tracing::info!`.
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn record(&self, entry: &AuditEntry) {
        tracing::info!(
            event = ?entry.event,
            actor = %entry.actor,
            outcome = ?entry.outcome,
            details = ?entry.details,
            "AUDIT"
        );
    }
}

/// A caller label safe to log.
pub fn actor_label(identity: &CallerIdentity) -> String {
    match &identity.token {
        None => "anonymous".into(),
        Some(token) => {
            let prefix: String = token.chars().take(4).collect();
            format!("token:{prefix}****")
        }
    }
}

pub struct AuditLogger {
    entries: Mutex<VecDeque<AuditEntry>>,
    capacity: usize,
    sinks: Vec<Box<dyn AuditSink>>,
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger")
            .field("entry_count", &self.count())
            .field("capacity", &self.capacity)
            .field("sink_count", &self.sinks.len())
            .finish()
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditLogger {
    pub fn new() -> Self {
        Self::with_sinks(Vec::new())
    }

    pub fn with_sinks(sinks: Vec<Box<dyn AuditSink>>) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            capacity: DEFAULT_CAPACITY,
            sinks,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn log(
        &self,
        event: AuditEvent,
        identity: &CallerIdentity,
        outcome: AuditOutcome,
        details: Option<String>,
    ) {
        let entry = AuditEntry {
            timestamp: Utc::now(),
            event,
            actor: actor_label(identity),
            outcome,
            details,
        };

        for sink in &self.sinks {
            sink.record(&entry);
        }

        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Retained entries, oldest first.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    pub fn entries_by_outcome(&self, outcome: &AuditOutcome) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|e| &e.outcome == outcome)
            .cloned()
            .collect()
    }

    pub fn count(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn log_and_retrieve_entries() {
        let logger = AuditLogger::new();
        logger.log(
            AuditEvent::TierResolved { tier: "pro".into() },
            &CallerIdentity::bearer("sk-live-123456"),
            AuditOutcome::Success,
            None,
        );
        logger.log(
            AuditEvent::RateLimited,
            &CallerIdentity::anonymous(),
            AuditOutcome::Denied,
            Some("60/min".into()),
        );

        let entries = logger.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].actor, "token:sk-l****");
        assert_eq!(entries[1].actor, "anonymous");
        assert_eq!(logger.entries_by_outcome(&AuditOutcome::Denied).len(), 1);
    }

    #[test]
    fn buffer_is_bounded() {
        let logger = AuditLogger::new().with_capacity(2);
        for kind in ["a", "b", "c"] {
            logger.log(
                AuditEvent::RequestRejected { kind: kind.into() },
                &CallerIdentity::anonymous(),
                AuditOutcome::Denied,
                None,
            );
        }
        let entries = logger.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].event, AuditEvent::RequestRejected { kind: "b".into() });
    }

    #[test]
    fn sinks_receive_entries() {
        struct CountingSink(Arc<Mutex<usize>>);
        impl AuditSink for CountingSink {
            fn record(&self, _entry: &AuditEntry) {
                *self.0.lock().unwrap() += 1;
            }
        }

        let count = Arc::new(Mutex::new(0));
        let logger = AuditLogger::with_sinks(vec![
            Box::new(CountingSink(Arc::clone(&count))),
            Box::new(TracingSink),
        ]);
        logger.log(
            AuditEvent::TierDegraded { tier: "restricted".into() },
            &CallerIdentity::bearer("x"),
            AuditOutcome::Degraded,
            Some("Unrecognized caller token".into()),
        );
        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[test]
    fn event_serialization() {
        let json = serde_json::to_string(&AuditEvent::TierDegraded { tier: "restricted".into() }).unwrap();
        assert_eq!(json, r#"{"type":"tier_degraded","tier":"restricted"}"#);
    }
}
