//! The feature gate: per-tool tier enforcement and upgrade-as-data.
//!
//! Insufficient tiers never surface as JSON-RPC errors. The gate renders a
//! structured `upgrade_required` payload that travels inside the normal
//! `tools/call` success envelope, so AI clients can show it to users.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Value, json};
use tracing::warn;

use super::billing::BillingSink;
use super::{LicenseContext, Tier};

/// What the upgrade payload says about the gated feature
#[derive(Debug, Clone)]
pub struct GatedFeature {
    pub name: String,
    pub description: String,
}

impl GatedFeature {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Process-wide licence gate shared by every tool invocation.
pub struct FeatureGate {
    context: LicenseContext,
    billing: Arc<dyn BillingSink>,
    payment_links: BTreeMap<Tier, String>,
}

impl FeatureGate {
    pub fn new(context: LicenseContext, billing: Arc<dyn BillingSink>) -> Self {
        Self {
            context,
            billing,
            payment_links: BTreeMap::new(),
        }
    }

    pub fn with_payment_link(mut self, tier: Tier, url: impl Into<String>) -> Self {
        self.payment_links.insert(tier, url.into());
        self
    }

    pub fn current_tier(&self) -> Tier {
        self.context.tier
    }

    pub fn context(&self) -> &LicenseContext {
        &self.context
    }

    /// Whether the resolved tier satisfies a tool's requirement
    pub fn has_tier(&self, required: Tier) -> bool {
        self.context.tier >= required
    }

    /// Render the upgrade payload returned in place of a gated tool's
    /// output.
    pub fn upgrade_payload(&self, feature: &GatedFeature, required: Tier) -> Value {
        let mut payload = json!({
            "status": "upgrade_required",
            "featureName": feature.name,
            "featureDescription": feature.description,
            "currentTier": self.context.tier.as_str(),
            "requiredTier": required.as_str(),
            "upgradeMessage": format!(
                "'{}' requires the {} tier. Your current tier is {}.",
                feature.name, required, self.context.tier
            ),
        });

        if let Some(link) = self.payment_links.get(&required) {
            payload["paymentLink"] = json!(link);
        }
        if !self.payment_links.is_empty() {
            let plans: BTreeMap<&str, &str> = self
                .payment_links
                .iter()
                .map(|(tier, url)| (tier.as_str(), url.as_str()))
                .collect();
            payload["availablePlans"] = json!(plans);
        }
        payload
    }

    /// Emit a billing event after a successful premium call. Failures are
    /// logged and swallowed; billing never fails a request.
    pub fn record_usage(&self, event: &str) {
        if let Err(err) = self.billing.emit(event) {
            warn!(event, error = %err, "billing emission failed");
        }
    }

    pub fn metered_usage(&self) -> u64 {
        self.billing.metered_usage()
    }
}
