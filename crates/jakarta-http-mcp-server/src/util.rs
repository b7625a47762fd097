//! Small HTTP helpers shared by the transports: response body plumbing,
//! query-string parsing, and bearer-header logging.

use std::collections::{HashMap, HashSet};
use std::convert::Infallible;

use bytes::Bytes;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full};
use hyper::header::{AUTHORIZATION, CONTENT_TYPE};
use hyper::{HeaderMap, Response, StatusCode};
use tracing::debug;

/// Boxed response body used across the transports, covering both full and
/// streaming responses.
pub type HttpBody = UnsyncBoxBody<Bytes, Infallible>;

pub fn full_body(bytes: impl Into<Bytes>) -> HttpBody {
    Full::new(bytes.into()).boxed_unsync()
}

pub fn json_response(status: StatusCode, body: String) -> Response<HttpBody> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(full_body(body))
        .expect("static response headers are valid")
}

pub fn empty_response(status: StatusCode) -> Response<HttpBody> {
    Response::builder()
        .status(status)
        .body(full_body(Bytes::new()))
        .expect("static response headers are valid")
}

/// Decode a query string into a key/value map. Values are
/// percent-decoded; repeated keys keep the last occurrence.
pub fn parse_query(query: Option<&str>) -> HashMap<String, String> {
    let mut params = HashMap::new();
    let Some(query) = query else {
        return params;
    };
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let value = urlencoding::decode(value)
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| value.to_string());
        params.insert(key.to_string(), value);
    }
    params
}

/// Parse the `tools=a,b,c` filter parameter. An absent or empty parameter
/// means "no filter".
pub fn parse_tool_filter(params: &HashMap<String, String>) -> Option<HashSet<String>> {
    let raw = params.get("tools")?;
    let tools: HashSet<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect();
    (!tools.is_empty()).then_some(tools)
}

/// Log the presence of a bearer token (length only, never the value).
/// Validation is a deliberate hook for future tightening; a missing
/// header is permitted.
pub fn log_bearer_token(headers: &HeaderMap) {
    if let Some(token) = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
    {
        debug!(token_length = token.len(), "bearer token presented (not validated)");
    }
}
