//! HTTP server: TCP accept loop, per-connection tasks, and path routing
//! to the SSE and streamable-HTTP handlers.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use jakarta_mcp_json_rpc::JsonRpcDispatcher;
use jakarta_mcp_protocol::{Implementation, McpError};

use crate::session::SessionRegistry;
use crate::sse::SseHandler;
use crate::streamable::StreamableHttpHandler;
use crate::util::{HttpBody, empty_response};

/// Tuning for SSE streams and the session registry
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Bounded emit-queue size per session; overflow closes the session
    pub channel_capacity: usize,
    /// Interval between keep-alive comments on idle streams
    pub keepalive_interval: Duration,
    /// Idle time after which the sweep removes a session
    pub session_expiry: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
            keepalive_interval: Duration::from_secs(30),
            session_expiry: Duration::from_secs(30 * 60),
        }
    }
}

/// Bind parameters and endpoint paths for the HTTP transports
#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    pub bind_address: SocketAddr,
    /// SSE base path (GET stream + POST submit); `None` disables SSE
    pub sse_path: Option<String>,
    /// Streamable-HTTP POST path; `None` disables the endpoint
    pub streamable_path: Option<String>,
    pub stream: StreamConfig,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            bind_address: ([127, 0, 0, 1], 8080).into(),
            sse_path: Some("/mcp/sse".to_string()),
            streamable_path: Some("/mcp/streamable-http".to_string()),
            stream: StreamConfig::default(),
        }
    }
}

/// The HTTP-facing MCP server. Both transports share one dispatcher and
/// one session registry.
pub struct HttpMcpServer {
    config: HttpServerConfig,
    sessions: Arc<SessionRegistry>,
    sse: SseHandler,
    streamable: StreamableHttpHandler,
}

impl HttpMcpServer {
    pub fn new(
        config: HttpServerConfig,
        dispatcher: Arc<JsonRpcDispatcher<McpError>>,
        server_info: Implementation,
    ) -> Self {
        let sessions = Arc::new(SessionRegistry::new());
        let sse = SseHandler::new(
            dispatcher.clone(),
            sessions.clone(),
            server_info,
            config.stream.clone(),
        );
        let streamable = StreamableHttpHandler::new(dispatcher);
        Self {
            config,
            sessions,
            sse,
            streamable,
        }
    }

    pub fn session_registry(&self) -> Arc<SessionRegistry> {
        self.sessions.clone()
    }

    /// Serve until ctrl-c.
    pub async fn run(self) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.config.bind_address).await?;
        info!(address = %self.config.bind_address, "HTTP MCP server listening");
        if let Some(path) = &self.config.sse_path {
            info!(%path, "SSE endpoint enabled");
        }
        if let Some(path) = &self.config.streamable_path {
            info!(%path, "streamable HTTP endpoint enabled");
        }

        self.start_session_sweep();
        let server = Arc::new(self);

        loop {
            let (stream, peer_addr) = tokio::select! {
                accepted = listener.accept() => accepted?,
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown signal received");
                    return Ok(());
                }
            };
            debug!(peer = %peer_addr, "connection accepted");

            let server = server.clone();
            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req| {
                    let server = server.clone();
                    async move { Ok::<_, hyper::Error>(server.route(req).await) }
                });
                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    // Clients dropping mid-stream are routine for SSE.
                    debug!(error = %err, "connection ended with error");
                }
            });
        }
    }

    fn start_session_sweep(&self) {
        let sessions = self.sessions.clone();
        let expiry = self.config.stream.session_expiry;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                let expired = sessions.expire_idle(expiry);
                if expired > 0 {
                    info!(expired, "expired idle SSE sessions");
                }
            }
        });
    }

    /// Route one request to a transport handler.
    pub async fn route(&self, req: Request<hyper::body::Incoming>) -> Response<HttpBody> {
        let path = req.uri().path().to_string();
        let method = req.method().clone();
        debug!(%method, %path, "routing request");

        if self.config.sse_path.as_deref() == Some(path.as_str()) {
            return match method {
                Method::GET => self.sse.handle_get(req).await,
                Method::POST => self.sse.handle_post(req).await,
                _ => empty_response(StatusCode::METHOD_NOT_ALLOWED),
            };
        }
        if self.config.streamable_path.as_deref() == Some(path.as_str()) {
            return match method {
                Method::POST => self.streamable.handle_post(req).await,
                _ => empty_response(StatusCode::METHOD_NOT_ALLOWED),
            };
        }
        error!(%path, "no handler for path");
        empty_response(StatusCode::NOT_FOUND)
    }
}
