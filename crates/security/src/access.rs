//! Config-backed access resolution.
//!
//! Bearer tokens map to tier names; tier names map to policy bundles. The
//! built-in tiers (`free`, `pro`, `enterprise`, `restricted`) are always
//! defined and may be overridden from `[access.tiers]`.

use async_trait::async_trait;
use grantscout_config::{AccessConfig, TierConfig};
use grantscout_core::{AccessError, AccessResolver, AccessTier, CallerIdentity};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::audit::{AuditEvent, AuditLogger, AuditOutcome};

/// Tiers available without any configuration.
pub fn builtin_tiers() -> BTreeMap<String, AccessTier> {
    let tiers = [
        AccessTier {
            tier: "free".into(),
            results_limit: 10,
            can_export: false,
            can_see_emails: false,
            can_see_abstracts: false,
            quota: Some(50),
        },
        AccessTier {
            tier: "pro".into(),
            results_limit: 100,
            can_export: true,
            can_see_emails: false,
            can_see_abstracts: true,
            quota: Some(1000),
        },
        AccessTier {
            tier: "enterprise".into(),
            results_limit: 500,
            can_export: true,
            can_see_emails: true,
            can_see_abstracts: true,
            quota: None,
        },
        AccessTier::most_restrictive(),
    ];
    tiers.into_iter().map(|t| (t.tier.clone(), t)).collect()
}

fn tier_from_config(name: &str, config: &TierConfig) -> AccessTier {
    AccessTier {
        tier: name.to_string(),
        results_limit: config.results_limit,
        can_export: config.can_export,
        can_see_emails: config.can_see_emails,
        can_see_abstracts: config.can_see_abstracts,
        quota: config.quota,
    }
}

/// Resolves callers from the `[access]` section of the config file.
pub struct ConfiguredAccessResolver {
    anonymous_tier: String,
    fallback_tier: String,
    tokens: BTreeMap<String, String>,
    tiers: BTreeMap<String, AccessTier>,
}

impl ConfiguredAccessResolver {
    pub fn from_config(config: &AccessConfig) -> Self {
        let mut tiers = builtin_tiers();
        for (name, tier) in &config.tiers {
            tiers.insert(name.clone(), tier_from_config(name, tier));
        }
        Self {
            anonymous_tier: config.anonymous_tier.clone(),
            fallback_tier: config.fallback_tier.clone(),
            tokens: config.tokens.clone(),
            tiers,
        }
    }

    pub fn tier(&self, name: &str) -> Option<&AccessTier> {
        self.tiers.get(name)
    }

    pub fn tier_names(&self) -> Vec<&str> {
        self.tiers.keys().map(String::as_str).collect()
    }

    fn lookup(&self, name: &str) -> Result<AccessTier, AccessError> {
        self.tiers
            .get(name)
            .cloned()
            .ok_or_else(|| AccessError::UnknownTier(name.to_string()))
    }
}

impl Default for ConfiguredAccessResolver {
    fn default() -> Self {
        Self::from_config(&AccessConfig::default())
    }
}

#[async_trait]
impl AccessResolver for ConfiguredAccessResolver {
    async fn resolve(&self, identity: &CallerIdentity) -> Result<AccessTier, AccessError> {
        let name = match &identity.token {
            None => &self.anonymous_tier,
            Some(token) => self.tokens.get(token).ok_or(AccessError::UnknownToken)?,
        };
        let tier = self.lookup(name)?;
        debug!(tier = %tier.tier, anonymous = identity.token.is_none(), "Resolved access tier");
        Ok(tier)
    }

    fn fallback(&self) -> AccessTier {
        self.tiers
            .get(&self.fallback_tier)
            .cloned()
            .unwrap_or_else(AccessTier::most_restrictive)
    }
}

/// Resolve a caller's tier, degrading to the fallback on failure and
/// recording the decision.
pub async fn resolve_audited(
    resolver: &dyn AccessResolver,
    identity: &CallerIdentity,
    audit: &AuditLogger,
) -> AccessTier {
    match resolver.resolve(identity).await {
        Ok(tier) => {
            audit.log(
                AuditEvent::TierResolved {
                    tier: tier.tier.clone(),
                },
                identity,
                AuditOutcome::Success,
                None,
            );
            tier
        }
        Err(e) => {
            let fallback = resolver.fallback();
            warn!(error = %e, tier = %fallback.tier, "Access resolution failed, degrading");
            audit.log(
                AuditEvent::TierDegraded {
                    tier: fallback.tier.clone(),
                },
                identity,
                AuditOutcome::Degraded,
                Some(e.to_string()),
            );
            fallback
        }
    }
}
