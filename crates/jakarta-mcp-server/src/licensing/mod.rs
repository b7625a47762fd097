//! Licence context, tier ordering, and the licence oracle seam.
//!
//! The licence is resolved once per process. Tool-level enforcement lives
//! in [`gate::FeatureGate`]; billing in [`billing`]; session persistence
//! behind the [`store`] trait.

pub mod billing;
pub mod gate;
pub mod store;

pub use billing::{BillingError, BillingSink, MeteredBillingSink};
pub use gate::{FeatureGate, GatedFeature};
pub use store::{InMemoryLicenseStore, LicenseSessionRecord, LicenseSessionStore};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::LicenseConfig;

/// Entitlement level. The ordering is total and drives every gate check.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    #[default]
    Community,
    Premium,
    Enterprise,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Community => "COMMUNITY",
            Tier::Premium => "PREMIUM",
            Tier::Enterprise => "ENTERPRISE",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The licence resolved for this process. Effectively immutable for the
/// process lifetime; no live revalidation happens per request.
#[derive(Debug, Clone)]
pub struct LicenseContext {
    pub tier: Tier,
    pub display_name: String,
    pub expiry: Option<DateTime<Utc>>,
}

impl LicenseContext {
    pub fn community() -> Self {
        Self {
            tier: Tier::Community,
            display_name: "Community Edition".to_string(),
            expiry: None,
        }
    }
}

/// Failure talking to the licence backend (as opposed to a key that the
/// backend examined and rejected).
#[derive(Debug, thiserror::Error)]
#[error("license validation unavailable: {0}")]
pub struct OracleError(pub String);

/// The licence oracle: validates a key against whatever subscription
/// backend the deployment wires in. `Ok(None)` means the backend examined
/// the key and rejected it.
#[async_trait]
pub trait LicenseOracle: Send + Sync {
    async fn validate_license(&self, key: &str) -> Result<Option<Tier>, OracleError>;
}

/// Resolve the process licence context from configuration, consulting the
/// oracle exactly once. An unreachable backend is fatal unless
/// `allow_offline` is set, in which case the server starts on the
/// Community tier.
pub async fn resolve_context(
    oracle: &dyn LicenseOracle,
    config: &LicenseConfig,
) -> Result<LicenseContext, OracleError> {
    let Some(key) = config.key.as_deref().filter(|k| !k.is_empty()) else {
        info!("no license key configured, running on Community tier");
        return Ok(LicenseContext::community());
    };

    match oracle.validate_license(key).await {
        Ok(Some(tier)) => {
            info!(%tier, "license validated");
            Ok(LicenseContext {
                tier,
                display_name: format!("{} Edition", title_case(tier.as_str())),
                expiry: None,
            })
        }
        Ok(None) => {
            warn!("license key rejected, falling back to Community tier");
            Ok(LicenseContext::community())
        }
        Err(err) if config.allow_offline => {
            warn!(error = %err, "license backend unreachable, offline mode allows Community tier");
            Ok(LicenseContext::community())
        }
        Err(err) => Err(err),
    }
}

/// Resolve the licence like [`resolve_context`], consulting the session
/// store first so restarts inside the cache TTL skip the oracle round
/// trip entirely.
pub async fn resolve_context_cached(
    oracle: &dyn LicenseOracle,
    store: &dyn LicenseSessionStore,
    config: &LicenseConfig,
) -> Result<LicenseContext, OracleError> {
    let Some(key) = config.key.as_deref().filter(|k| !k.is_empty()) else {
        return resolve_context(oracle, config).await;
    };

    if let Some(record) = store.get_by_key(key).await {
        info!(tier = %record.tier, "license resolved from cached session");
        return Ok(LicenseContext {
            tier: record.tier,
            display_name: format!("{} Edition", title_case(record.tier.as_str())),
            expiry: Some(record.expires_at),
        });
    }

    let context = resolve_context(oracle, config).await?;
    let now = Utc::now();
    store
        .put(
            LicenseSessionRecord {
                session_id: key.to_string(),
                // Customer email is attached by the credential adapters;
                // the cache itself only needs key lookup.
                email: String::new(),
                license_key: key.to_string(),
                tier: context.tier,
                created_at: now,
                expires_at: now,
            },
            config.cache_ttl(),
        )
        .await;
    Ok(context)
}

fn title_case(s: &str) -> String {
    let lower = s.to_ascii_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => lower,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedOracle(Result<Option<Tier>, ()>);

    #[async_trait]
    impl LicenseOracle for FixedOracle {
        async fn validate_license(&self, _key: &str) -> Result<Option<Tier>, OracleError> {
            self.0
                .clone()
                .map_err(|_| OracleError("backend down".to_string()))
        }
    }

    fn license_config(key: Option<&str>, allow_offline: bool) -> LicenseConfig {
        LicenseConfig {
            key: key.map(String::from),
            allow_offline,
            ..LicenseConfig::default()
        }
    }

    #[test]
    fn tier_ordering_is_total() {
        assert!(Tier::Community < Tier::Premium);
        assert!(Tier::Premium < Tier::Enterprise);
        assert_eq!(Tier::Premium.as_str(), "PREMIUM");
    }

    #[tokio::test]
    async fn no_key_resolves_community() {
        let context = resolve_context(
            &FixedOracle(Ok(Some(Tier::Enterprise))),
            &license_config(None, false),
        )
        .await
        .unwrap();
        assert_eq!(context.tier, Tier::Community);
    }

    #[tokio::test]
    async fn valid_key_resolves_backend_tier() {
        let context = resolve_context(
            &FixedOracle(Ok(Some(Tier::Premium))),
            &license_config(Some("key-123"), false),
        )
        .await
        .unwrap();
        assert_eq!(context.tier, Tier::Premium);
        assert_eq!(context.display_name, "Premium Edition");
    }

    #[tokio::test]
    async fn rejected_key_falls_back_to_community() {
        let context = resolve_context(&FixedOracle(Ok(None)), &license_config(Some("bad"), false))
            .await
            .unwrap();
        assert_eq!(context.tier, Tier::Community);
    }

    #[tokio::test]
    async fn cached_session_skips_the_oracle() {
        let store = InMemoryLicenseStore::new();
        let config = license_config(Some("jm-key"), false);

        // First resolution hits the (working) oracle and caches.
        let first = resolve_context_cached(
            &FixedOracle(Ok(Some(Tier::Enterprise))),
            &store,
            &config,
        )
        .await
        .unwrap();
        assert_eq!(first.tier, Tier::Enterprise);

        // Second resolution succeeds even though the backend is down.
        let second = resolve_context_cached(&FixedOracle(Err(())), &store, &config)
            .await
            .unwrap();
        assert_eq!(second.tier, Tier::Enterprise);
        assert!(second.expiry.is_some());
    }

    #[tokio::test]
    async fn unreachable_backend_respects_allow_offline() {
        let offline = resolve_context(&FixedOracle(Err(())), &license_config(Some("k"), true))
            .await
            .unwrap();
        assert_eq!(offline.tier, Tier::Community);

        let fatal = resolve_context(&FixedOracle(Err(())), &license_config(Some("k"), false)).await;
        assert!(fatal.is_err());
    }
}
