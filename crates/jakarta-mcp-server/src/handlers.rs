//! MCP method handlers.
//!
//! [`build_dispatcher`] assembles the complete method table used by every
//! transport: `initialize`, `tools/list`, `tools/call`, `ping`, and the
//! inbound `notifications/initialized` notification. Anything else is the
//! dispatcher's method-not-found.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, warn};

use jakarta_mcp_json_rpc::{JsonRpcDispatcher, JsonRpcHandler, RequestParams, SessionContext};
use jakarta_mcp_protocol::{
    CallToolRequest, CallToolResult, Implementation, InitializeResult, ListToolsResult, McpError,
    McpResult,
};

use crate::licensing::{FeatureGate, GatedFeature};
use crate::registry::{ToolRegistry, coerce_arguments};

/// Handles the `initialize` handshake
struct InitializeHandler {
    server_info: Implementation,
}

#[async_trait]
impl JsonRpcHandler for InitializeHandler {
    type Error = McpError;

    async fn handle(
        &self,
        _method: &str,
        _params: Option<RequestParams>,
        _session: Option<SessionContext>,
    ) -> McpResult<Value> {
        let result = InitializeResult::new(self.server_info.clone());
        Ok(serde_json::to_value(result)?)
    }
}

/// Handles `ping`
struct PingHandler;

#[async_trait]
impl JsonRpcHandler for PingHandler {
    type Error = McpError;

    async fn handle(
        &self,
        _method: &str,
        _params: Option<RequestParams>,
        _session: Option<SessionContext>,
    ) -> McpResult<Value> {
        Ok(json!({"status": "pong"}))
    }
}

/// Handles `tools/list` and `tools/call`, applying the session's tool
/// filter and the licence gate.
struct ToolsHandler {
    registry: Arc<ToolRegistry>,
    gate: Arc<FeatureGate>,
}

impl ToolsHandler {
    fn list(&self, session: Option<&SessionContext>) -> McpResult<Value> {
        let tools = self
            .registry
            .list_tools()
            .into_iter()
            .filter(|tool| session.is_none_or(|s| s.tool_enabled(&tool.name)))
            .collect();
        Ok(serde_json::to_value(ListToolsResult { tools })?)
    }

    async fn call(
        &self,
        params: Option<RequestParams>,
        session: Option<&SessionContext>,
    ) -> McpResult<Value> {
        let params = params
            .map(|p| p.to_value())
            .ok_or_else(|| McpError::InvalidParameters("tools/call requires params".to_string()))?;
        let request: CallToolRequest = serde_json::from_value(params)
            .map_err(|err| McpError::InvalidParameters(err.to_string()))?;

        // A filtered-out tool is indistinguishable from a missing one.
        if !session.is_none_or(|s| s.tool_enabled(&request.name)) {
            return Err(McpError::ToolNotFound(request.name));
        }
        let registration = self
            .registry
            .get(&request.name)
            .ok_or_else(|| McpError::ToolNotFound(request.name.clone()))?;
        let descriptor = &registration.descriptor;

        if !self.gate.has_tier(descriptor.required_tier) {
            debug!(tool = %descriptor.name, required = %descriptor.required_tier,
                current = %self.gate.current_tier(), "tier insufficient, returning upgrade prompt");
            let feature = GatedFeature::new(&descriptor.name, &descriptor.description);
            let payload = self
                .gate
                .upgrade_payload(&feature, descriptor.required_tier);
            let result = CallToolResult::text(payload.to_string());
            return Ok(serde_json::to_value(result)?);
        }

        let args = coerce_arguments(descriptor, &request.arguments)?;
        let output = registration.handler.call(args).await?;

        if let Some(event) = &descriptor.billing_event {
            self.gate.record_usage(event);
        }
        Ok(serde_json::to_value(CallToolResult::text(output))?)
    }
}

#[async_trait]
impl JsonRpcHandler for ToolsHandler {
    type Error = McpError;

    async fn handle(
        &self,
        method: &str,
        params: Option<RequestParams>,
        session: Option<SessionContext>,
    ) -> McpResult<Value> {
        match method {
            "tools/list" => self.list(session.as_ref()),
            "tools/call" => self.call(params, session.as_ref()).await,
            other => {
                warn!(method = other, "tools handler received unexpected method");
                Err(McpError::InvalidParameters(format!(
                    "unsupported method: {other}"
                )))
            }
        }
    }
}

/// Accepts the client's `notifications/initialized` and drops it
struct InitializedNotificationHandler;

#[async_trait]
impl JsonRpcHandler for InitializedNotificationHandler {
    type Error = McpError;

    async fn handle(
        &self,
        _method: &str,
        _params: Option<RequestParams>,
        _session: Option<SessionContext>,
    ) -> McpResult<Value> {
        // Sent as a notification in practice; answering the request form
        // with an empty object keeps broken clients alive.
        Ok(json!({}))
    }

    async fn handle_notification(
        &self,
        _method: &str,
        _params: Option<RequestParams>,
        session: Option<SessionContext>,
    ) -> McpResult<()> {
        debug!(session = ?session.and_then(|s| s.session_id), "client initialized");
        Ok(())
    }
}

/// Build the complete JSON-RPC method table shared by all transports.
pub fn build_dispatcher(
    server_info: Implementation,
    registry: Arc<ToolRegistry>,
    gate: Arc<FeatureGate>,
) -> JsonRpcDispatcher<McpError> {
    let mut dispatcher = JsonRpcDispatcher::new();
    dispatcher.register_method("initialize", InitializeHandler { server_info });
    dispatcher.register_method("ping", PingHandler);
    dispatcher.register_methods(
        vec!["tools/list".to_string(), "tools/call".to_string()],
        ToolsHandler { registry, gate },
    );
    dispatcher.register_method("notifications/initialized", InitializedNotificationHandler);
    dispatcher
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::licensing::billing::BillingSink;
    use crate::licensing::{LicenseContext, MeteredBillingSink, Tier};
    use crate::registry::{
        ParameterDescriptor, ToolArguments, ToolDescriptor, ToolHandler, ToolRegistration,
    };
    use jakarta_mcp_json_rpc::{JsonRpcMessage, JsonRpcRequest, RequestId, error_codes};
    use serde_json::json;
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;

    struct StaticHandler(&'static str);

    #[async_trait]
    impl ToolHandler for StaticHandler {
        async fn call(&self, _args: ToolArguments) -> McpResult<String> {
            Ok(self.0.to_string())
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl ToolHandler for FailingHandler {
        async fn call(&self, _args: ToolArguments) -> McpResult<String> {
            Err(McpError::tool_execution("analyzer backend unavailable"))
        }
    }

    fn fixture(tier: Tier) -> (JsonRpcDispatcher<McpError>, Arc<MeteredBillingSink>) {
        let mut registry = ToolRegistry::new();
        registry
            .register(ToolRegistration::new(
                ToolDescriptor::new("detectBlockers", "Detect migration blockers")
                    .with_parameters(vec![ParameterDescriptor::required_string(
                        "projectPath",
                        "Path to the project root",
                    )]),
                StaticHandler("{\"blockers\":[]}"),
            ))
            .unwrap();
        registry
            .register(ToolRegistration::new(
                ToolDescriptor::new("verifyJarRuntime", "Verify a migrated JAR at runtime")
                    .with_required_tier(Tier::Premium)
                    .with_billing_event("jakarta.verify.runtime"),
                StaticHandler("{\"status\":\"SUCCESS\"}"),
            ))
            .unwrap();
        registry
            .register(ToolRegistration::new(
                ToolDescriptor::new("brokenTool", "Always fails"),
                FailingHandler,
            ))
            .unwrap();

        let billing = Arc::new(MeteredBillingSink::new(true, None));
        let context = LicenseContext {
            tier,
            display_name: format!("{tier} Edition"),
            expiry: None,
        };
        let gate = Arc::new(FeatureGate::new(context, billing.clone()));
        let dispatcher = build_dispatcher(
            Implementation::new("jakarta-migration-mcp", "0.4.2"),
            Arc::new(registry),
            gate,
        );
        (dispatcher, billing)
    }

    fn call_params(name: &str, arguments: Value) -> RequestParams {
        RequestParams::Object(HashMap::from([
            ("name".to_string(), json!(name)),
            ("arguments".to_string(), arguments),
        ]))
    }

    fn expect_response(message: JsonRpcMessage) -> Value {
        match message {
            JsonRpcMessage::Response(resp) => resp.result,
            JsonRpcMessage::Error(err) => panic!("unexpected error: {err}"),
        }
    }

    #[tokio::test]
    async fn initialize_returns_pinned_protocol_version() {
        let (dispatcher, _) = fixture(Tier::Community);
        let result = expect_response(
            dispatcher
                .handle_request(JsonRpcRequest::new(1, "initialize"), None)
                .await,
        );
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["capabilities"]["tools"]["listChanged"], false);
        assert_eq!(result["serverInfo"]["name"], "jakarta-migration-mcp");
    }

    #[tokio::test]
    async fn ping_pongs() {
        let (dispatcher, _) = fixture(Tier::Community);
        let result = expect_response(
            dispatcher
                .handle_request(JsonRpcRequest::new(2, "ping"), None)
                .await,
        );
        assert_eq!(result, json!({"status": "pong"}));
    }

    #[tokio::test]
    async fn tools_list_includes_every_registered_tool() {
        let (dispatcher, _) = fixture(Tier::Community);
        let result = expect_response(
            dispatcher
                .handle_request(JsonRpcRequest::new(3, "tools/list"), None)
                .await,
        );
        let names: Vec<&str> = result["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["detectBlockers", "verifyJarRuntime", "brokenTool"]);
    }

    #[tokio::test]
    async fn tools_list_respects_session_filter() {
        let (dispatcher, _) = fixture(Tier::Community);
        let session = SessionContext::new("s1")
            .with_enabled_tools(HashSet::from(["detectBlockers".to_string()]));
        let result = expect_response(
            dispatcher
                .handle_request(JsonRpcRequest::new(4, "tools/list"), Some(session))
                .await,
        );
        let tools = result["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], "detectBlockers");
    }

    #[tokio::test]
    async fn call_success_wraps_output_in_text_content() {
        let (dispatcher, _) = fixture(Tier::Community);
        let request = JsonRpcRequest::new(5, "tools/call")
            .with_params(call_params("detectBlockers", json!({"projectPath": "/srv/app"})));
        let result = expect_response(dispatcher.handle_request(request, None).await);
        assert_eq!(result["content"][0]["type"], "text");
        assert_eq!(result["content"][0]["text"], "{\"blockers\":[]}");
    }

    #[tokio::test]
    async fn call_unknown_tool_is_32602() {
        let (dispatcher, _) = fixture(Tier::Community);
        let request = JsonRpcRequest::new(99, "tools/call")
            .with_params(call_params("doesNotExist", json!({})));
        let JsonRpcMessage::Error(err) = dispatcher.handle_request(request, None).await else {
            panic!("expected error");
        };
        assert_eq!(err.error.code, error_codes::INVALID_PARAMS);
        assert_eq!(err.error.message, "Tool not found: doesNotExist");
        assert_eq!(err.id, Some(RequestId::Number(99)));
    }

    #[tokio::test]
    async fn call_missing_required_parameter_is_32602() {
        let (dispatcher, _) = fixture(Tier::Community);
        let request = JsonRpcRequest::new(6, "tools/call")
            .with_params(call_params("detectBlockers", json!({})));
        let JsonRpcMessage::Error(err) = dispatcher.handle_request(request, None).await else {
            panic!("expected error");
        };
        assert_eq!(err.error.code, error_codes::INVALID_PARAMS);
        assert!(err.error.message.contains("projectPath"));
    }

    #[tokio::test]
    async fn call_filtered_tool_reads_as_missing() {
        let (dispatcher, _) = fixture(Tier::Community);
        let session = SessionContext::new("s2")
            .with_enabled_tools(HashSet::from(["verifyJarRuntime".to_string()]));
        let request = JsonRpcRequest::new(7, "tools/call")
            .with_params(call_params("detectBlockers", json!({"projectPath": "/srv/app"})));
        let JsonRpcMessage::Error(err) =
            dispatcher.handle_request(request, Some(session)).await
        else {
            panic!("expected error");
        };
        assert_eq!(err.error.code, error_codes::INVALID_PARAMS);
        assert_eq!(err.error.message, "Tool not found: detectBlockers");
    }

    #[tokio::test]
    async fn handler_failure_is_32603() {
        let (dispatcher, _) = fixture(Tier::Community);
        let request = JsonRpcRequest::new(8, "tools/call")
            .with_params(call_params("brokenTool", json!({})));
        let JsonRpcMessage::Error(err) = dispatcher.handle_request(request, None).await else {
            panic!("expected error");
        };
        assert_eq!(err.error.code, error_codes::INTERNAL_ERROR);
        assert_eq!(err.error.message, "analyzer backend unavailable");
    }

    #[tokio::test]
    async fn premium_tool_on_community_tier_returns_upgrade_payload() {
        let (dispatcher, billing) = fixture(Tier::Community);
        let request = JsonRpcRequest::new(9, "tools/call")
            .with_params(call_params("verifyJarRuntime", json!({})));
        let result = expect_response(dispatcher.handle_request(request, None).await);

        let text = result["content"][0]["text"].as_str().unwrap();
        let payload: Value = serde_json::from_str(text).unwrap();
        assert_eq!(payload["status"], "upgrade_required");
        assert_eq!(payload["currentTier"], "COMMUNITY");
        assert_eq!(payload["requiredTier"], "PREMIUM");
        // No billing event for a refused call.
        assert_eq!(billing.metered_usage(), 0);
    }

    #[tokio::test]
    async fn premium_tool_on_premium_tier_runs_and_bills_once() {
        let (dispatcher, billing) = fixture(Tier::Premium);
        let request = JsonRpcRequest::new(10, "tools/call")
            .with_params(call_params("verifyJarRuntime", json!({})));
        let result = expect_response(dispatcher.handle_request(request, None).await);

        assert_eq!(result["content"][0]["text"], "{\"status\":\"SUCCESS\"}");
        assert_eq!(billing.metered_usage(), 1);
    }

    #[tokio::test]
    async fn unknown_method_is_32601() {
        let (dispatcher, _) = fixture(Tier::Community);
        let JsonRpcMessage::Error(err) = dispatcher
            .handle_request(JsonRpcRequest::new(11, "resources/list"), None)
            .await
        else {
            panic!("expected error");
        };
        assert_eq!(err.error.code, error_codes::METHOD_NOT_FOUND);
        assert_eq!(err.error.message, "Method not found: resources/list");
    }
}
