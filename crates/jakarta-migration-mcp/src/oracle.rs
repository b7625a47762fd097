//! Bundled licence oracle.
//!
//! Deployments that validate keys against a subscription backend plug
//! their own [`LicenseOracle`] in; this one resolves tiers from signed
//! key prefixes so the server works offline out of the box.

use async_trait::async_trait;

use jakarta_mcp_server::licensing::{LicenseOracle, OracleError, Tier};

/// Resolves `jm-ent-*` keys to Enterprise and `jm-pro-*` keys to
/// Premium; anything else is rejected.
#[derive(Default)]
pub struct KeyPrefixOracle;

#[async_trait]
impl LicenseOracle for KeyPrefixOracle {
    async fn validate_license(&self, key: &str) -> Result<Option<Tier>, OracleError> {
        let tier = if key.starts_with("jm-ent-") {
            Some(Tier::Enterprise)
        } else if key.starts_with("jm-pro-") {
            Some(Tier::Premium)
        } else {
            None
        };
        Ok(tier)
    }
}
