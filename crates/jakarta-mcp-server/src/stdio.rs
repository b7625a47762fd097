//! Stdio transport: one JSON-RPC object per line, strictly sequential.
//!
//! Stdout carries responses and nothing else; every diagnostic goes to
//! stderr through `tracing`. The loop exits cleanly at end-of-input.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

use jakarta_mcp_json_rpc::{IncomingMessage, JsonRpcDispatcher, JsonRpcMessage, parse_message};
use jakarta_mcp_protocol::McpError;

/// Serve JSON-RPC over the process's standard streams until EOF.
pub async fn run(dispatcher: Arc<JsonRpcDispatcher<McpError>>) -> std::io::Result<()> {
    serve(dispatcher, tokio::io::stdin(), tokio::io::stdout()).await
}

/// Transport loop over arbitrary streams. Split out from [`run`] so tests
/// can drive it with in-memory pipes.
pub async fn serve<R, W>(
    dispatcher: Arc<JsonRpcDispatcher<McpError>>,
    reader: R,
    mut writer: W,
) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = match parse_message(&line) {
            Ok(IncomingMessage::Request(request)) => {
                debug!(method = %request.method, id = %request.id, "stdio request");
                Some(dispatcher.handle_request(request, None).await)
            }
            Ok(IncomingMessage::Notification(notification)) => {
                if let Err(err) = dispatcher.handle_notification(notification, None).await {
                    warn!(error = %err, "notification handler failed");
                }
                None
            }
            Err(error) => Some(JsonRpcMessage::Error(error)),
        };

        if let Some(response) = response {
            writer.write_all(response.to_json().as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
    }
    debug!("stdio transport reached end of input");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::build_dispatcher;
    use crate::licensing::{FeatureGate, LicenseContext, MeteredBillingSink};
    use crate::registry::ToolRegistry;
    use jakarta_mcp_protocol::Implementation;
    use serde_json::Value;

    fn dispatcher() -> Arc<JsonRpcDispatcher<McpError>> {
        let gate = Arc::new(FeatureGate::new(
            LicenseContext::community(),
            Arc::new(MeteredBillingSink::disabled()),
        ));
        Arc::new(build_dispatcher(
            Implementation::new("jakarta-migration-mcp", "0.4.2"),
            Arc::new(ToolRegistry::new()),
            gate,
        ))
    }

    async fn drive(input: &str) -> Vec<String> {
        let mut output = Vec::new();
        serve(dispatcher(), input.as_bytes(), &mut output)
            .await
            .unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(String::from)
            .collect()
    }

    #[tokio::test]
    async fn initialize_round_trip_is_one_line() {
        let lines = drive("{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"initialize\",\"params\":{}}\n").await;
        assert_eq!(lines.len(), 1);

        let value: Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(value["id"], 1);
        assert_eq!(value["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(
            value["result"]["capabilities"]["resources"],
            serde_json::json!({"subscribe": false, "listChanged": false})
        );
        assert_eq!(value["result"]["serverInfo"]["name"], "jakarta-migration-mcp");
    }

    #[tokio::test]
    async fn parse_error_keeps_stream_alive() {
        let lines = drive("{oops\n{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}\n").await;
        assert_eq!(lines.len(), 2);

        let first: Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(first["error"]["code"], -32700);

        let second: Value = serde_json::from_str(&lines[1]).unwrap();
        assert_eq!(second["result"]["status"], "pong");
    }

    #[tokio::test]
    async fn notifications_produce_no_output() {
        let lines = drive("{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n").await;
        assert!(lines.is_empty());
    }

    #[tokio::test]
    async fn blank_lines_are_skipped() {
        let lines = drive("\n\n{\"jsonrpc\":\"2.0\",\"id\":3,\"method\":\"ping\"}\n").await;
        assert_eq!(lines.len(), 1);
    }

    #[tokio::test]
    async fn eof_exits_cleanly() {
        let mut output = Vec::new();
        serve(dispatcher(), &b""[..], &mut output).await.unwrap();
        assert!(output.is_empty());
    }
}
