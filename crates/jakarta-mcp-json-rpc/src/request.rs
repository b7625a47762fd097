use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::JsonRpcError;
use crate::notification::JsonRpcNotification;
use crate::types::{JsonRpcVersion, RequestId};

/// Parameters for a JSON-RPC request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestParams {
    /// Named parameters as an object
    Object(HashMap<String, Value>),
    /// Positional parameters as an array
    Array(Vec<Value>),
}

impl RequestParams {
    /// Get a named parameter (object params only)
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            RequestParams::Object(map) => map.get(key),
            RequestParams::Array(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            RequestParams::Object(map) => map.is_empty(),
            RequestParams::Array(vec) => vec.is_empty(),
        }
    }

    /// Convert to a `serde_json::Value` for handlers that take raw payloads
    pub fn to_value(&self) -> Value {
        match self {
            RequestParams::Object(map) => {
                Value::Object(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            }
            RequestParams::Array(vec) => Value::Array(vec.clone()),
        }
    }
}

impl From<HashMap<String, Value>> for RequestParams {
    fn from(map: HashMap<String, Value>) -> Self {
        RequestParams::Object(map)
    }
}

/// A JSON-RPC request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub id: RequestId,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<RequestParams>,
}

impl JsonRpcRequest {
    pub fn new(id: impl Into<RequestId>, method: impl Into<String>) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            id: id.into(),
            method: method.into(),
            params: None,
        }
    }

    pub fn with_params(mut self, params: impl Into<RequestParams>) -> Self {
        self.params = Some(params.into());
        self
    }

    /// Get a named parameter (object params only)
    pub fn get_param(&self, name: &str) -> Option<&Value> {
        self.params.as_ref()?.get(name)
    }
}

/// One parsed inbound message: a request expecting a response, or a
/// fire-and-forget notification.
#[derive(Debug, Clone)]
pub enum IncomingMessage {
    Request(JsonRpcRequest),
    Notification(JsonRpcNotification),
}

/// Parse one raw JSON text into an [`IncomingMessage`].
///
/// Malformed JSON maps to `-32700`; a well-formed value that is not a
/// JSON-RPC 2.0 request or notification maps to `-32600`. Transports call
/// this at the wire seam so the dispatcher only ever sees valid envelopes.
pub fn parse_message(text: &str) -> Result<IncomingMessage, JsonRpcError> {
    let value: Value = serde_json::from_str(text).map_err(|_| JsonRpcError::parse_error())?;

    let Value::Object(ref obj) = value else {
        return Err(JsonRpcError::invalid_request(None));
    };
    if obj.get("jsonrpc").and_then(Value::as_str) != Some(crate::JSONRPC_VERSION) {
        return Err(JsonRpcError::invalid_request(request_id_of(obj)));
    }

    if obj.contains_key("id") {
        serde_json::from_value::<JsonRpcRequest>(value.clone())
            .map(IncomingMessage::Request)
            .map_err(|_| JsonRpcError::invalid_request(request_id_of(obj)))
    } else {
        serde_json::from_value::<JsonRpcNotification>(value)
            .map(IncomingMessage::Notification)
            .map_err(|_| JsonRpcError::invalid_request(None))
    }
}

fn request_id_of(obj: &Map<String, Value>) -> Option<RequestId> {
    obj.get("id")
        .and_then(|id| serde_json::from_value(id.clone()).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{from_str, json, to_string};

    #[test]
    fn request_round_trip() {
        let request = JsonRpcRequest::new(1, "tools/list");
        let text = to_string(&request).unwrap();
        let parsed: JsonRpcRequest = from_str(&text).unwrap();

        assert_eq!(parsed.id, RequestId::Number(1));
        assert_eq!(parsed.method, "tools/list");
        assert!(parsed.params.is_none());
    }

    #[test]
    fn named_params_lookup() {
        let mut params = HashMap::new();
        params.insert("name".to_string(), json!("analyzeProject"));
        params.insert("arguments".to_string(), json!({"projectPath": "/tmp/app"}));

        let request = JsonRpcRequest::new("req-1", "tools/call").with_params(params);

        assert_eq!(request.get_param("name"), Some(&json!("analyzeProject")));
        assert_eq!(request.get_param("missing"), None);
    }

    #[test]
    fn parse_request_and_notification() {
        let parsed = parse_message(r#"{"jsonrpc":"2.0","id":3,"method":"ping"}"#).unwrap();
        assert!(matches!(parsed, IncomingMessage::Request(ref r) if r.method == "ping"));

        let parsed =
            parse_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).unwrap();
        assert!(matches!(parsed, IncomingMessage::Notification(_)));
    }

    #[test]
    fn parse_rejects_malformed_json() {
        let err = parse_message("{not json").unwrap_err();
        assert_eq!(err.error.code, crate::error_codes::PARSE_ERROR);
    }

    #[test]
    fn parse_rejects_wrong_version() {
        let err = parse_message(r#"{"jsonrpc":"1.0","id":1,"method":"ping"}"#).unwrap_err();
        assert_eq!(err.error.code, crate::error_codes::INVALID_REQUEST);
        assert_eq!(err.id, Some(RequestId::Number(1)));
    }

    #[test]
    fn parse_rejects_non_object() {
        let err = parse_message("[1,2,3]").unwrap_err();
        assert_eq!(err.error.code, crate::error_codes::INVALID_REQUEST);
    }

    #[test]
    fn null_id_is_a_request() {
        let parsed = parse_message(r#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#).unwrap();
        assert!(matches!(parsed, IncomingMessage::Request(ref r) if r.id.is_null()));
    }
}
