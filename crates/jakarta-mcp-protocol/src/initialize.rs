//! MCP initialization handshake types.
//!
//! The capabilities this server advertises are constant: tools without
//! list-change notifications, and empty prompt/resource stubs.

use serde::{Deserialize, Serialize};

/// Name and version of an MCP implementation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Implementation {
    pub name: String,
    pub version: String,
}

impl Implementation {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Tool capabilities advertised by the server
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCapabilities {
    pub list_changed: bool,
}

/// Prompt capabilities (advertised as an empty stub)
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptsCapabilities {
    pub list_changed: bool,
}

/// Resource capabilities (advertised as an empty stub)
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcesCapabilities {
    pub subscribe: bool,
    pub list_changed: bool,
}

/// The full capability set. [`ServerCapabilities::default`] is the only
/// value this server ever sends.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerCapabilities {
    pub tools: ToolsCapabilities,
    pub prompts: PromptsCapabilities,
    pub resources: ResourcesCapabilities,
}

/// Parameters of an `initialize` request. Clients send their own version
/// and identity; the server accepts any shape here and always answers with
/// its own fixed version.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeRequest {
    #[serde(default)]
    pub protocol_version: Option<String>,
    #[serde(default)]
    pub client_info: Option<Implementation>,
}

/// Result payload for `initialize`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    pub server_info: Implementation,
}

impl InitializeResult {
    pub fn new(server_info: Implementation) -> Self {
        Self {
            protocol_version: crate::MCP_VERSION.to_string(),
            capabilities: ServerCapabilities::default(),
            server_info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn initialize_result_wire_shape() {
        let result = InitializeResult::new(Implementation::new("jakarta-migration-mcp", "0.4.2"));
        let value = serde_json::to_value(&result).unwrap();

        assert_eq!(
            value,
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {
                    "tools": {"listChanged": false},
                    "prompts": {"listChanged": false},
                    "resources": {"subscribe": false, "listChanged": false}
                },
                "serverInfo": {"name": "jakarta-migration-mcp", "version": "0.4.2"}
            })
        );
    }

    #[test]
    fn initialize_request_tolerates_empty_params() {
        let request: InitializeRequest = serde_json::from_value(json!({})).unwrap();
        assert!(request.protocol_version.is_none());
        assert!(request.client_info.is_none());
    }
}
