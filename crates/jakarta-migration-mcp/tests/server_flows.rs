//! End-to-end flows through the assembled server: stdio framing, the
//! full tool catalogue, and licence gating.

use std::sync::Arc;

use serde_json::{Value, json};

use jakarta_mcp_json_rpc::{JsonRpcDispatcher, JsonRpcMessage, JsonRpcRequest, RequestParams};
use jakarta_mcp_protocol::McpError;
use jakarta_mcp_server::config::ServerConfig;
use jakarta_mcp_server::stdio;
use jakarta_migration_mcp::bootstrap;

async fn dispatcher_for(config: &ServerConfig) -> Arc<JsonRpcDispatcher<McpError>> {
    bootstrap(config).await.unwrap().dispatcher
}

fn call_request(id: i64, name: &str, arguments: Value) -> JsonRpcRequest {
    JsonRpcRequest::new(id, "tools/call").with_params(RequestParams::Object(
        [
            ("name".to_string(), json!(name)),
            ("arguments".to_string(), arguments),
        ]
        .into_iter()
        .collect(),
    ))
}

fn result_of(message: JsonRpcMessage) -> Value {
    match message {
        JsonRpcMessage::Response(resp) => resp.result,
        JsonRpcMessage::Error(err) => panic!("unexpected error: {err}"),
    }
}

fn content_text(result: &Value) -> Value {
    let text = result["content"][0]["text"].as_str().unwrap();
    serde_json::from_str(text).unwrap()
}

#[tokio::test]
async fn initialize_over_stdio_matches_wire_contract() {
    let config = ServerConfig::default();
    let dispatcher = dispatcher_for(&config).await;

    let input = "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"initialize\",\"params\":{}}\n";
    let mut output = Vec::new();
    stdio::serve(dispatcher, input.as_bytes(), &mut output)
        .await
        .unwrap();

    let text = String::from_utf8(output).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 1);

    let value: Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(
        value,
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {
                "protocolVersion": "2024-11-05",
                "capabilities": {
                    "tools": {"listChanged": false},
                    "prompts": {"listChanged": false},
                    "resources": {"subscribe": false, "listChanged": false}
                },
                "serverInfo": {
                    "name": config.server.name,
                    "version": config.server.version
                }
            }
        })
    );
}

#[tokio::test]
async fn every_tool_lists_with_a_valid_schema() {
    let dispatcher = dispatcher_for(&ServerConfig::default()).await;
    let result = result_of(
        dispatcher
            .handle_request(JsonRpcRequest::new(2, "tools/list"), None)
            .await,
    );

    let tools = result["tools"].as_array().unwrap();
    assert!(tools.len() >= 9);
    for tool in tools {
        assert!(!tool["name"].as_str().unwrap().is_empty());
        assert!(!tool["description"].as_str().unwrap().is_empty());
        let schema = &tool["inputSchema"];
        assert_eq!(schema["type"], "object");

        // `required` ⊆ declared property names.
        let properties = schema["properties"].as_object().unwrap();
        if let Some(required) = schema.get("required") {
            for name in required.as_array().unwrap() {
                assert!(properties.contains_key(name.as_str().unwrap()));
            }
        }
    }
}

#[tokio::test]
async fn parameterless_tools_run_with_default_arguments() {
    let dispatcher = dispatcher_for(&ServerConfig::default()).await;
    let list = result_of(
        dispatcher
            .handle_request(JsonRpcRequest::new(3, "tools/list"), None)
            .await,
    );

    for tool in list["tools"].as_array().unwrap() {
        let schema = &tool["inputSchema"];
        let has_required = schema
            .get("required")
            .and_then(Value::as_array)
            .is_some_and(|r| !r.is_empty());
        if has_required {
            continue;
        }
        let name = tool["name"].as_str().unwrap();
        let result = result_of(
            dispatcher
                .handle_request(call_request(4, name, json!({})), None)
                .await,
        );
        assert_eq!(result["content"][0]["type"], "text", "tool {name}");
    }
}

#[tokio::test]
async fn community_tier_gets_upgrade_payload_for_premium_tool() {
    let config = ServerConfig::default();
    let server = bootstrap(&config).await.unwrap();

    let result = result_of(
        server
            .dispatcher
            .handle_request(
                call_request(5, "createMigrationPlan", json!({"projectPath": "/srv/app"})),
                None,
            )
            .await,
    );

    let payload = content_text(&result);
    assert_eq!(payload["status"], "upgrade_required");
    assert_eq!(payload["currentTier"], "COMMUNITY");
    assert_eq!(payload["requiredTier"], "PREMIUM");
    assert!(payload["paymentLink"].as_str().unwrap().contains("premium"));
    // A refused call never bills.
    assert_eq!(server.gate.metered_usage(), 0);
}

#[tokio::test]
async fn premium_tier_runs_the_tool_and_bills() {
    let mut config = ServerConfig::default();
    config.license.key = Some("jm-pro-test".to_string());
    let server = bootstrap(&config).await.unwrap();

    let project = tempfile::TempDir::new().unwrap();
    std::fs::write(
        project.path().join("pom.xml"),
        r#"<project><dependencies><dependency>
            <groupId>javax.servlet</groupId>
            <artifactId>javax.servlet-api</artifactId>
            <version>4.0.1</version>
        </dependency></dependencies></project>"#,
    )
    .unwrap();

    let result = result_of(
        server
            .dispatcher
            .handle_request(
                call_request(
                    6,
                    "createMigrationPlan",
                    json!({"projectPath": project.path().display().to_string()}),
                ),
                None,
            )
            .await,
    );

    let plan = content_text(&result);
    assert_eq!(plan["phases"][0]["name"], "dependencies");
    assert_eq!(server.gate.metered_usage(), 1);
}

#[tokio::test]
async fn extra_unknown_arguments_are_ignored() {
    let dispatcher = dispatcher_for(&ServerConfig::default()).await;
    let result = result_of(
        dispatcher
            .handle_request(
                call_request(7, "listMigrationRecipes", json!({"unexpected": [1, 2, 3]})),
                None,
            )
            .await,
    );
    assert_eq!(result["content"][0]["type"], "text");
}

#[tokio::test]
async fn unknown_tool_is_invalid_params() {
    let dispatcher = dispatcher_for(&ServerConfig::default()).await;
    let message = dispatcher
        .handle_request(call_request(99, "doesNotExist", json!({})), None)
        .await;

    let JsonRpcMessage::Error(err) = message else {
        panic!("expected error");
    };
    assert_eq!(err.error.code, -32602);
    assert_eq!(err.error.message, "Tool not found: doesNotExist");
}
