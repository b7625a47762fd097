//! # Model Context Protocol (MCP) - 2024-11-05 Wire Types
//!
//! Typed request and result payloads for the MCP methods this server
//! speaks: `initialize`, `tools/list`, `tools/call`, and `ping`, plus the
//! domain error type that maps onto JSON-RPC error objects.
//!
//! Everything here serializes with camelCase keys as MCP clients expect.

pub mod initialize;
pub mod tools;

pub use initialize::{Implementation, InitializeRequest, InitializeResult, ServerCapabilities};
pub use tools::{
    CallToolRequest, CallToolResult, ContentBlock, JsonType, ListToolsResult, PropertySchema,
    Tool, ToolSchema,
};

use jakarta_mcp_json_rpc::{JsonRpcErrorObject, ToJsonRpcError};

/// The MCP protocol version implemented by this server. The literal must
/// match what clients negotiate during `initialize`.
pub const MCP_VERSION: &str = "2024-11-05";

/// Common result type for MCP operations
pub type McpResult<T> = Result<T, McpError>;

/// MCP-specific errors.
///
/// The variants partition exactly onto the JSON-RPC codes this server is
/// allowed to produce: argument and lookup failures become `-32602`, and
/// everything raised inside a tool body becomes `-32603`. Anything the
/// server handled successfully (including analysing a broken artifact)
/// is data, not an error.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid value for parameter '{param}': expected {expected}")]
    InvalidParameterType { param: String, expected: String },

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Tool execution failed: {0}")]
    ToolExecution(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl McpError {
    pub fn missing_param(param: &str) -> Self {
        Self::MissingParameter(param.to_string())
    }

    pub fn invalid_param_type(param: &str, expected: &str) -> Self {
        Self::InvalidParameterType {
            param: param.to_string(),
            expected: expected.to_string(),
        }
    }

    pub fn tool_execution(message: impl Into<String>) -> Self {
        Self::ToolExecution(message.into())
    }
}

impl From<String> for McpError {
    fn from(message: String) -> Self {
        Self::ToolExecution(message)
    }
}

impl ToJsonRpcError for McpError {
    fn to_error_object(&self) -> JsonRpcErrorObject {
        match self {
            McpError::ToolNotFound(name) => {
                JsonRpcErrorObject::invalid_params(&format!("Tool not found: {}", name))
            }
            McpError::MissingParameter(_)
            | McpError::InvalidParameterType { .. }
            | McpError::InvalidParameters(_) => {
                JsonRpcErrorObject::invalid_params(&self.to_string())
            }
            McpError::ToolExecution(message) => {
                JsonRpcErrorObject::internal_error(Some(message.clone()))
            }
            McpError::Serialization(err) => {
                JsonRpcErrorObject::internal_error(Some(err.to_string()))
            }
        }
    }
}
