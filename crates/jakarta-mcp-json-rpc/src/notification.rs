use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::request::RequestParams;
use crate::types::JsonRpcVersion;

/// A JSON-RPC notification (request without an id, never answered)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<RequestParams>,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            method: method.into(),
            params: None,
        }
    }

    pub fn with_params(mut self, params: HashMap<String, Value>) -> Self {
        self.params = Some(RequestParams::Object(params));
        self
    }

    /// Get a named parameter (object params only)
    pub fn get_param(&self, name: &str) -> Option<&Value> {
        self.params.as_ref()?.get(name)
    }
}
