//! Server configuration.
//!
//! Loaded from a TOML file and overridable by the binary's CLI flags.
//! Every recognised option is typed here; unknown keys are rejected so a
//! misspelled option fails at startup instead of silently defaulting.

use std::time::Duration;

use serde::Deserialize;

/// Which wire binding the process serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Transport {
    #[default]
    Stdio,
    Sse,
    StreamableHttp,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ServerInfoConfig {
    pub name: String,
    pub version: String,
    pub description: String,
}

impl Default for ServerInfoConfig {
    fn default() -> Self {
        Self {
            name: "jakarta-migration-mcp".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: "Jakarta EE migration tooling over MCP".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SseConfig {
    pub port: u16,
    pub path: String,
}

impl Default for SseConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            path: "/mcp/sse".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct StreamableConfig {
    pub port: u16,
    pub path: String,
}

impl Default for StreamableConfig {
    fn default() -> Self {
        Self {
            port: 8081,
            path: "/mcp/streamable-http".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LicenseConfig {
    pub key: Option<String>,
    /// TTL for cached licence sessions, seconds
    pub cache_ttl_secs: u64,
    pub allow_offline: bool,
}

impl Default for LicenseConfig {
    fn default() -> Self {
        Self {
            key: None,
            cache_ttl_secs: 24 * 60 * 60,
            allow_offline: false,
        }
    }
}

impl LicenseConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct BillingConfig {
    pub enabled: bool,
    pub cap: Option<u64>,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cap: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct VerificationConfig {
    pub default_timeout_secs: u64,
    pub default_max_memory_bytes: u64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: 30,
            default_max_memory_bytes: 512 * 1024 * 1024,
        }
    }
}

impl VerificationConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }
}

/// Root configuration document
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ServerConfig {
    pub transport: Transport,
    pub server: ServerInfoConfig,
    pub sse: SseConfig,
    pub streamable: StreamableConfig,
    #[serde(alias = "licence")]
    pub license: LicenseConfig,
    pub billing: BillingConfig,
    pub verification: VerificationConfig,
}

impl ServerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}
