use std::fmt;

use serde::{Deserialize, Serialize};

/// The `jsonrpc` version marker. Serializes as the literal `"2.0"`; any
/// other value fails deserialization, which surfaces as an invalid request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JsonRpcVersion {
    #[serde(rename = "2.0")]
    V2_0,
}

impl Default for JsonRpcVersion {
    fn default() -> Self {
        Self::V2_0
    }
}

impl fmt::Display for JsonRpcVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(crate::JSONRPC_VERSION)
    }
}

/// A JSON-RPC request id. Echoed verbatim in the paired response.
///
/// The `Null` variant covers clients that send an explicit `"id": null`;
/// notifications omit the field entirely and are modelled separately.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
    Null,
}

impl RequestId {
    pub fn is_null(&self) -> bool {
        matches!(self, RequestId::Null)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{}", n),
            RequestId::String(s) => f.write_str(s),
            RequestId::Null => f.write_str("null"),
        }
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        RequestId::Number(n)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::String(s.to_string())
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        RequestId::String(s)
    }
}
