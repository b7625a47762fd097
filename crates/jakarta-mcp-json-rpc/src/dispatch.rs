use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{JsonRpcError, JsonRpcErrorObject};
use crate::notification::JsonRpcNotification;
use crate::request::{JsonRpcRequest, RequestParams};
use crate::response::JsonRpcMessage;

/// Minimal per-request session context handed from a transport to handlers.
///
/// Stdio requests carry no context. SSE and streamable HTTP attach the
/// session id (when one exists) and the connection's tool-name filter.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    /// Transport session identifier, when the transport has sessions
    pub session_id: Option<String>,
    /// Explicit set of enabled tool names; `None` means every tool is visible
    pub enabled_tools: Option<HashSet<String>>,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            enabled_tools: None,
        }
    }

    pub fn with_enabled_tools(mut self, tools: HashSet<String>) -> Self {
        // An empty filter set means "no filter" at the wire level.
        self.enabled_tools = (!tools.is_empty()).then_some(tools);
        self
    }

    /// Whether the filter permits the given tool name
    pub fn tool_enabled(&self, name: &str) -> bool {
        match &self.enabled_tools {
            Some(filter) => filter.contains(name),
            None => true,
        }
    }
}

/// Trait for domain errors that know their JSON-RPC representation
pub trait ToJsonRpcError: std::error::Error + Send + Sync + 'static {
    fn to_error_object(&self) -> JsonRpcErrorObject;
}

/// Trait for handling JSON-RPC method calls.
///
/// Handlers return domain errors only; the dispatcher converts them into
/// protocol error envelopes.
#[async_trait]
pub trait JsonRpcHandler: Send + Sync {
    type Error: ToJsonRpcError;

    async fn handle(
        &self,
        method: &str,
        params: Option<RequestParams>,
        session: Option<SessionContext>,
    ) -> Result<Value, Self::Error>;

    /// Handle a notification (default: ignore)
    async fn handle_notification(
        &self,
        method: &str,
        params: Option<RequestParams>,
        session: Option<SessionContext>,
    ) -> Result<(), Self::Error> {
        let _ = (method, params, session);
        Ok(())
    }
}

/// JSON-RPC method dispatcher. Populated once at startup, read-only after.
pub struct JsonRpcDispatcher<E>
where
    E: ToJsonRpcError,
{
    handlers: HashMap<String, Arc<dyn JsonRpcHandler<Error = E>>>,
}

impl<E> JsonRpcDispatcher<E>
where
    E: ToJsonRpcError,
{
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for a specific method
    pub fn register_method<H>(&mut self, method: impl Into<String>, handler: H)
    where
        H: JsonRpcHandler<Error = E> + 'static,
    {
        self.handlers.insert(method.into(), Arc::new(handler));
    }

    /// Register one handler for several methods
    pub fn register_methods<H>(&mut self, methods: Vec<String>, handler: H)
    where
        H: JsonRpcHandler<Error = E> + 'static,
    {
        let handler = Arc::new(handler);
        for method in methods {
            self.handlers.insert(method, handler.clone());
        }
    }

    pub fn supported_methods(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }

    /// Process one request and produce exactly one response envelope.
    /// Unknown methods map to `-32601`.
    pub async fn handle_request(
        &self,
        request: JsonRpcRequest,
        session: Option<SessionContext>,
    ) -> JsonRpcMessage {
        match self.handlers.get(&request.method) {
            Some(handler) => {
                match handler.handle(&request.method, request.params, session).await {
                    Ok(result) => JsonRpcMessage::success(request.id, result),
                    Err(domain_error) => {
                        let error_object = domain_error.to_error_object();
                        JsonRpcMessage::Error(JsonRpcError::new(Some(request.id), error_object))
                    }
                }
            }
            None => {
                JsonRpcMessage::Error(JsonRpcError::method_not_found(request.id, &request.method))
            }
        }
    }

    /// Process a notification. Notifications for unknown methods are dropped
    /// silently; handler errors are surfaced for the transport to log.
    pub async fn handle_notification(
        &self,
        notification: JsonRpcNotification,
        session: Option<SessionContext>,
    ) -> Result<(), E> {
        match self.handlers.get(&notification.method) {
            Some(handler) => {
                handler
                    .handle_notification(&notification.method, notification.params, session)
                    .await
            }
            None => Ok(()),
        }
    }
}

impl<E> Default for JsonRpcDispatcher<E>
where
    E: ToJsonRpcError,
{
    fn default() -> Self {
        Self::new()
    }
}
