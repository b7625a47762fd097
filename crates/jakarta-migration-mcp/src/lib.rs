//! # Jakarta Migration MCP Server
//!
//! Wires the framework crates into a runnable server: the tool catalogue
//! over the bundled analysers and the runtime verifier, licence
//! resolution, and the transport selected by configuration.

pub mod analyzers;
pub mod oracle;
pub mod tools;

use std::sync::Arc;

use tracing::info;

use jakarta_mcp_json_rpc::JsonRpcDispatcher;
use jakarta_mcp_protocol::{Implementation, McpError};
use jakarta_mcp_server::config::ServerConfig;
use jakarta_mcp_server::licensing::{
    self, FeatureGate, InMemoryLicenseStore, LicenseSessionStore, MeteredBillingSink, Tier,
};
use jakarta_mcp_server::registry::ToolRegistry;
use jakarta_verifier::RuntimeVerifier;

use crate::analyzers::{
    BuildFileAnalyzer, BundledRecipes, ImportScanner, PhasedPlanner, ThresholdAggregator,
};
use crate::oracle::KeyPrefixOracle;
use crate::tools::{AnalysisToolProvider, VerificationToolProvider};

/// Everything a transport needs to serve requests.
pub struct Server {
    pub dispatcher: Arc<JsonRpcDispatcher<McpError>>,
    pub server_info: Implementation,
    pub gate: Arc<FeatureGate>,
    pub license_sessions: Arc<dyn LicenseSessionStore>,
}

/// Resolve the licence, build the tool registry from the bundled
/// providers, and assemble the dispatcher.
pub async fn bootstrap(config: &ServerConfig) -> anyhow::Result<Server> {
    let license_sessions: Arc<dyn LicenseSessionStore> = Arc::new(InMemoryLicenseStore::new());
    let context = licensing::resolve_context_cached(
        &KeyPrefixOracle,
        license_sessions.as_ref(),
        &config.license,
    )
    .await?;
    info!(tier = %context.tier, "license resolved");

    let billing = Arc::new(MeteredBillingSink::new(
        config.billing.enabled,
        config.billing.cap,
    ));
    let gate = Arc::new(
        FeatureGate::new(context, billing)
            .with_payment_link(Tier::Premium, "https://jakarta-tools.dev/upgrade/premium")
            .with_payment_link(
                Tier::Enterprise,
                "https://jakarta-tools.dev/upgrade/enterprise",
            ),
    );

    let analysis = AnalysisToolProvider {
        analyzer: Arc::new(BuildFileAnalyzer),
        planner: Arc::new(PhasedPlanner),
        scanner: Arc::new(ImportScanner),
        aggregator: Arc::new(ThresholdAggregator),
        recipes: Arc::new(BundledRecipes),
    };
    let verification = VerificationToolProvider {
        verifier: Arc::new(RuntimeVerifier::default()),
        defaults: config.verification.clone(),
    };

    let mut registry = ToolRegistry::new();
    registry.register_provider(&analysis)?;
    registry.register_provider(&verification)?;
    info!(tools = registry.len(), "tool registry built");

    let server_info = Implementation::new(&config.server.name, &config.server.version);
    let dispatcher = Arc::new(jakarta_mcp_server::build_dispatcher(
        server_info.clone(),
        Arc::new(registry),
        gate.clone(),
    ));

    Ok(Server {
        dispatcher,
        server_info,
        gate,
        license_sessions,
    })
}
