//! Streamable HTTP transport: one POST in, one JSON-RPC response out.
//!
//! No sessions, no streams: the transport of record for gateway-style
//! deployments that cannot hold long-lived connections. The `tools` query
//! parameter filters the catalogue exactly as it does for SSE; a `session`
//! query parameter is accepted for compatibility and ignored.

use std::sync::Arc;

use http_body::Body;
use hyper::{Request, Response, StatusCode};
use tracing::{debug, warn};

use jakarta_mcp_json_rpc::{
    IncomingMessage, JsonRpcDispatcher, JsonRpcError, JsonRpcMessage, SessionContext,
    parse_message,
};
use jakarta_mcp_protocol::McpError;

use crate::util::{
    HttpBody, empty_response, json_response, log_bearer_token, parse_query, parse_tool_filter,
};
use http_body_util::BodyExt;

/// Handles the single streamable-HTTP endpoint.
#[derive(Clone)]
pub struct StreamableHttpHandler {
    dispatcher: Arc<JsonRpcDispatcher<McpError>>,
}

impl StreamableHttpHandler {
    pub fn new(dispatcher: Arc<JsonRpcDispatcher<McpError>>) -> Self {
        Self { dispatcher }
    }

    pub async fn handle_post<B>(&self, req: Request<B>) -> Response<HttpBody>
    where
        B: Body + Send,
        B::Data: Send,
        B::Error: std::fmt::Display,
    {
        log_bearer_token(req.headers());
        let params = parse_query(req.uri().query());
        // `session` is advisory in this transport and deliberately unused.
        if let Some(session) = params.get("session") {
            debug!(%session, "ignoring advisory session parameter");
        }
        let tool_filter = parse_tool_filter(&params);

        let body = match req.into_body().collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) => {
                warn!(error = %err, "failed to read streamable HTTP body");
                return json_response(
                    StatusCode::OK,
                    JsonRpcMessage::Error(JsonRpcError::parse_error()).to_json(),
                );
            }
        };
        let text = String::from_utf8_lossy(&body);

        let context = tool_filter.map(|filter| SessionContext {
            session_id: None,
            enabled_tools: Some(filter),
        });

        match parse_message(&text) {
            Ok(IncomingMessage::Request(request)) => {
                let response = self.dispatcher.handle_request(request, context).await;
                json_response(StatusCode::OK, response.to_json())
            }
            Ok(IncomingMessage::Notification(notification)) => {
                if let Err(err) = self
                    .dispatcher
                    .handle_notification(notification, context)
                    .await
                {
                    warn!(error = %err, "notification handler failed");
                }
                empty_response(StatusCode::ACCEPTED)
            }
            Err(error) => json_response(StatusCode::OK, JsonRpcMessage::Error(error).to_json()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http_body_util::Full;
    use serde_json::Value;

    use jakarta_mcp_protocol::{Implementation, McpResult};
    use jakarta_mcp_server::licensing::{FeatureGate, LicenseContext, MeteredBillingSink};
    use jakarta_mcp_server::registry::{
        ToolArguments, ToolDescriptor, ToolHandler, ToolRegistration, ToolRegistry,
    };

    struct StaticHandler;

    #[async_trait::async_trait]
    impl ToolHandler for StaticHandler {
        async fn call(&self, _args: ToolArguments) -> McpResult<String> {
            Ok("{}".to_string())
        }
    }

    fn handler() -> StreamableHttpHandler {
        let mut registry = ToolRegistry::new();
        for name in ["analyzeProject", "detectBlockers"] {
            registry
                .register(ToolRegistration::new(
                    ToolDescriptor::new(name, "a migration tool"),
                    StaticHandler,
                ))
                .unwrap();
        }
        let gate = Arc::new(FeatureGate::new(
            LicenseContext::community(),
            Arc::new(MeteredBillingSink::disabled()),
        ));
        StreamableHttpHandler::new(Arc::new(jakarta_mcp_server::build_dispatcher(
            Implementation::new("jakarta-migration-mcp", "0.4.2"),
            Arc::new(registry),
            gate,
        )))
    }

    fn post(uri: &str, body: &str) -> Request<Full<Bytes>> {
        Request::builder()
            .uri(uri)
            .method("POST")
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap()
    }

    async fn body_json(response: Response<HttpBody>) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn one_post_one_response() {
        let response = handler()
            .handle_post(post(
                "/mcp/streamable-http",
                r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let value = body_json(response).await;
        assert_eq!(value["result"]["status"], "pong");
    }

    #[tokio::test]
    async fn unknown_tool_is_exact_error_shape() {
        let response = handler()
            .handle_post(post(
                "/mcp/streamable-http",
                r#"{"jsonrpc":"2.0","id":99,"method":"tools/call","params":{"name":"doesNotExist","arguments":{}}}"#,
            ))
            .await;
        let value = body_json(response).await;
        assert_eq!(
            value,
            serde_json::json!({
                "jsonrpc": "2.0",
                "id": 99,
                "error": {"code": -32602, "message": "Tool not found: doesNotExist"}
            })
        );
    }

    #[tokio::test]
    async fn tools_query_filters_catalogue() {
        let response = handler()
            .handle_post(post(
                "/mcp/streamable-http?tools=detectBlockers&session=ignored",
                r#"{"jsonrpc":"2.0","id":2,"method":"tools/list","params":{}}"#,
            ))
            .await;
        let value = body_json(response).await;
        let tools = value["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], "detectBlockers");
    }

    #[tokio::test]
    async fn parse_error_envelope_in_body() {
        let response = handler().handle_post(post("/mcp/streamable-http", "nope")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let value = body_json(response).await;
        assert_eq!(value["error"]["code"], -32700);
    }

    #[tokio::test]
    async fn notifications_are_accepted_without_body() {
        let response = handler()
            .handle_post(post(
                "/mcp/streamable-http",
                r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            ))
            .await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }
}
