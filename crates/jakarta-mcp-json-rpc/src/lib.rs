//! # JSON-RPC 2.0 Envelope Types and Dispatch
//!
//! A transport-agnostic JSON-RPC 2.0 implementation: envelope types, error
//! objects, and a method dispatcher with pluggable async handlers. Handlers
//! return domain errors; the dispatcher owns the conversion to protocol
//! error objects, so success and error responses can never be mixed in one
//! envelope.
//!
//! Transports (stdio, SSE, streamable HTTP) parse raw text with
//! [`parse_message`] and feed the result to a [`JsonRpcDispatcher`].

pub mod dispatch;
pub mod error;
pub mod notification;
pub mod request;
pub mod response;
pub mod types;

pub use dispatch::{JsonRpcDispatcher, JsonRpcHandler, SessionContext, ToJsonRpcError};
pub use error::{JsonRpcError, JsonRpcErrorCode, JsonRpcErrorObject};
pub use notification::JsonRpcNotification;
pub use request::{IncomingMessage, JsonRpcRequest, RequestParams, parse_message};
pub use response::{JsonRpcMessage, JsonRpcResponse};
pub use types::{JsonRpcVersion, RequestId};

/// JSON-RPC 2.0 version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC 2.0 error codes
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
}
