//! SSE transport: a long-lived `GET` event stream paired with `POST`
//! request submission.
//!
//! `GET` opens the stream, immediately emits the `notifications/initialized`
//! event, registers the session, and optionally processes one inline
//! request from the `message` query parameter. `POST` resolves a target
//! session (explicit header, else first available), dispatches under that
//! session's tool filter, emits the response on the stream, and returns
//! the same response in the POST body; the body is authoritative when the
//! two disagree.

use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use http_body::{Body, Frame};
use http_body_util::{BodyExt, StreamBody};
use hyper::header::{CACHE_CONTROL, CONTENT_TYPE};
use hyper::{Request, Response, StatusCode};
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use jakarta_mcp_json_rpc::{
    IncomingMessage, JsonRpcDispatcher, JsonRpcMessage, SessionContext, parse_message,
};
use jakarta_mcp_protocol::{Implementation, McpError};

use crate::server::StreamConfig;
use crate::session::{SessionGuard, SessionRegistry, SseEvent, SseSession};
use crate::util::{
    HttpBody, full_body, json_response, log_bearer_token, parse_query, parse_tool_filter,
};

/// Header binding a POST to a specific open stream
pub const SESSION_ID_HEADER: &str = "X-Session-Id";

/// Handles both halves of the SSE endpoint.
#[derive(Clone)]
pub struct SseHandler {
    dispatcher: Arc<JsonRpcDispatcher<McpError>>,
    registry: Arc<SessionRegistry>,
    server_info: Implementation,
    config: StreamConfig,
}

impl SseHandler {
    pub fn new(
        dispatcher: Arc<JsonRpcDispatcher<McpError>>,
        registry: Arc<SessionRegistry>,
        server_info: Implementation,
        config: StreamConfig,
    ) -> Self {
        Self {
            dispatcher,
            registry,
            server_info,
            config,
        }
    }

    fn session_context(session: &SseSession) -> SessionContext {
        SessionContext {
            session_id: Some(session.session_id.clone()),
            enabled_tools: session.tool_filter.clone(),
        }
    }

    /// Open an event stream.
    pub async fn handle_get<B>(&self, req: Request<B>) -> Response<HttpBody> {
        log_bearer_token(req.headers());
        let params = parse_query(req.uri().query());
        let tool_filter = parse_tool_filter(&params);

        let session_id = Uuid::now_v7().to_string();
        let (session, mut receiver) = self.registry.insert(
            session_id.clone(),
            tool_filter,
            self.config.channel_capacity,
        );
        debug!(%session_id, filtered = session.tool_filter.is_some(), "SSE stream opened");

        // The connection-open notification is the first frame on every stream.
        let initialized = json!({
            "jsonrpc": "2.0",
            "method": "notifications/initialized",
            "params": {
                "server": {
                    "name": self.server_info.name,
                    "version": self.server_info.version,
                }
            }
        });
        let _ = self.registry.emit(&session, SseEvent::Message(initialized));

        // A `message` query parameter is a single request processed inline;
        // its response rides the same stream.
        if let Some(inline) = params.get("message") {
            let response = self
                .process(inline, Some(Self::session_context(&session)))
                .await;
            if let Some(response) = response {
                let value = serde_json::to_value(&response)
                    .unwrap_or_else(|_| json!({"jsonrpc": "2.0", "id": null}));
                let _ = self.registry.emit(&session, SseEvent::Message(value));
            }
        }

        let registry = self.registry.clone();
        let keepalive_interval = self.config.keepalive_interval;
        let stream = async_stream::stream! {
            let _guard = SessionGuard::new(registry, session_id);
            let mut keepalive = tokio::time::interval(keepalive_interval);
            keepalive.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            keepalive.tick().await; // the first tick is immediate

            loop {
                tokio::select! {
                    event = receiver.recv() => match event {
                        Some(event) => {
                            yield Ok::<_, Infallible>(Frame::data(Bytes::from(event.format())));
                        }
                        // Emitter dropped: the session was removed.
                        None => break,
                    },
                    _ = keepalive.tick() => {
                        yield Ok(Frame::data(Bytes::from(SseEvent::KeepAlive.format())));
                    }
                }
            }
        };

        Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .header(SESSION_ID_HEADER, session.session_id.as_str())
            .body(StreamBody::new(stream).boxed_unsync())
            .expect("static response headers are valid")
    }

    /// Submit one request. The response is emitted on the resolved stream
    /// and always returned in the POST body.
    pub async fn handle_post<B>(&self, req: Request<B>) -> Response<HttpBody>
    where
        B: Body + Send,
        B::Data: Send,
        B::Error: std::fmt::Display,
    {
        log_bearer_token(req.headers());

        // Explicit header wins; a stale id falls through to the
        // body-only branch instead of erroring. Without a header, any
        // active session receives the event ("first available").
        let requested = req
            .headers()
            .get(SESSION_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(String::from);
        let session = match &requested {
            Some(id) => self.registry.get(id),
            None => self.registry.first_available(),
        };
        if session.is_none() {
            debug!(requested = ?requested, "no active stream, responding body-only");
        }

        let body = match req.into_body().collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) => {
                warn!(error = %err, "failed to read SSE POST body");
                return json_response(
                    StatusCode::OK,
                    JsonRpcMessage::Error(jakarta_mcp_json_rpc::JsonRpcError::parse_error())
                        .to_json(),
                );
            }
        };
        let text = String::from_utf8_lossy(&body);

        let context = session.as_ref().map(|s| Self::session_context(s));
        let Some(response) = self.process(&text, context).await else {
            return Response::builder()
                .status(StatusCode::ACCEPTED)
                .body(full_body(Bytes::new()))
                .expect("static response headers are valid");
        };

        if let Some(session) = session {
            let value = serde_json::to_value(&response)
                .unwrap_or_else(|_| json!({"jsonrpc": "2.0", "id": null}));
            if let Err(err) = self.registry.emit(&session, SseEvent::Message(value)) {
                // The POST body still carries the authoritative response.
                warn!(session_id = %session.session_id, error = %err, "SSE emit failed");
            }
        }
        json_response(StatusCode::OK, response.to_json())
    }

    /// Run one raw message through the dispatcher. Returns `None` for
    /// notifications, which have no response.
    async fn process(
        &self,
        text: &str,
        context: Option<SessionContext>,
    ) -> Option<JsonRpcMessage> {
        match parse_message(text) {
            Ok(IncomingMessage::Request(request)) => {
                Some(self.dispatcher.handle_request(request, context).await)
            }
            Ok(IncomingMessage::Notification(notification)) => {
                if let Err(err) = self
                    .dispatcher
                    .handle_notification(notification, context)
                    .await
                {
                    warn!(error = %err, "notification handler failed");
                }
                None
            }
            Err(error) => Some(JsonRpcMessage::Error(error)),
        }
    }
}
