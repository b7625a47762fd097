//! # Jakarta Migration MCP Server Core
//!
//! The transport-independent heart of the server: the tool registry with
//! schema generation and argument coercion, the MCP method handlers, the
//! licence/feature gate with metered billing, the stdio transport, and the
//! seams for injected collaborators (analysers, licence oracle, session
//! store).
//!
//! HTTP transports live in `jakarta-http-mcp-server`; the runtime verifier
//! in `jakarta-verifier`; the tool catalogue and wiring in the
//! `jakarta-migration-mcp` binary.

pub mod analyzers;
pub mod config;
pub mod handlers;
pub mod licensing;
pub mod registry;
pub mod stdio;

pub use config::{ServerConfig, Transport};
pub use handlers::build_dispatcher;
pub use licensing::{
    BillingSink, FeatureGate, LicenseContext, LicenseOracle, LicenseSessionStore,
    MeteredBillingSink, Tier,
};
pub use registry::{
    ParameterDescriptor, RegistryError, ToolArguments, ToolDescriptor, ToolHandler, ToolProvider,
    ToolRegistration, ToolRegistry,
};
