//! Access tiers and the resolver contract.
//!
//! A tier is a policy bundle gating result volume and features per caller.
//! Resolution failures never fail a request: the caller is degraded to a
//! fallback tier instead.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AccessError;

/// Policy bundle applied to one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTier {
    /// Tier name (e.g., "free", "pro")
    pub tier: String,

    /// Upper bound on rows any single tool call may return
    pub results_limit: u32,

    #[serde(default)]
    pub can_export: bool,

    #[serde(default)]
    pub can_see_emails: bool,

    #[serde(default)]
    pub can_see_abstracts: bool,

    /// Requests per day, `None` for unmetered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quota: Option<u32>,
}

impl AccessTier {
    /// The tier granted when nothing else can be established.
    pub fn most_restrictive() -> Self {
        Self {
            tier: "restricted".into(),
            results_limit: 5,
            can_export: false,
            can_see_emails: false,
            can_see_abstracts: false,
            quota: Some(0),
        }
    }

    /// Clamp a requested row count to this tier's limit. Zero means "use the limit".
    pub fn clamp_limit(&self, requested: Option<u64>) -> u32 {
        match requested {
            Some(0) | None => self.results_limit,
            Some(n) => n.min(self.results_limit as u64) as u32,
        }
    }
}

/// Who is calling, as far as the transport can tell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallerIdentity {
    /// Bearer token, if one was presented
    pub token: Option<String>,
}

impl CallerIdentity {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }
}

/// Maps an optional caller identity to a tier.
#[async_trait]
pub trait AccessResolver: Send + Sync {
    async fn resolve(&self, identity: &CallerIdentity) -> std::result::Result<AccessTier, AccessError>;

    /// Tier used when resolution fails.
    fn fallback(&self) -> AccessTier {
        AccessTier::most_restrictive()
    }
}

/// Resolve a tier, degrading to the resolver's fallback on failure.
pub async fn resolve_or_degrade(
    resolver: &dyn AccessResolver,
    identity: &CallerIdentity,
) -> AccessTier {
    match resolver.resolve(identity).await {
        Ok(tier) => tier,
        Err(e) => {
            let fallback = resolver.fallback();
            tracing::warn!(error = %e, tier = %fallback.tier, "Access resolution failed, degrading");
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingResolver;

    #[async_trait]
    impl AccessResolver for FailingResolver {
        async fn resolve(&self, _identity: &CallerIdentity) -> std::result::Result<AccessTier, AccessError> {
            Err(AccessError::UnknownToken)
        }
    }

    #[test]
    fn clamp_limit_bounds_requests() {
        let tier = AccessTier::most_restrictive();
        assert_eq!(tier.clamp_limit(None), 5);
        assert_eq!(tier.clamp_limit(Some(0)), 5);
        assert_eq!(tier.clamp_limit(Some(3)), 3);
        assert_eq!(tier.clamp_limit(Some(10_000)), 5);
    }

    #[tokio::test]
    async fn failure_degrades_to_fallback() {
        let tier = resolve_or_degrade(&FailingResolver, &CallerIdentity::bearer("nope")).await;
        assert_eq!(tier, AccessTier::most_restrictive());
    }

    #[test]
    fn tier_deserializes_with_defaults() {
        let tier: AccessTier =
            serde_json::from_str(r#"{"tier":"free","results_limit":10}"#).unwrap();
        assert!(!tier.can_export);
        assert!(tier.quota.is_none());
    }
}
