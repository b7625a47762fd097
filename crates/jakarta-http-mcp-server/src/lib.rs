//! # HTTP Transports for the Jakarta Migration MCP Server
//!
//! Two wire bindings over one hyper server:
//!
//! - **SSE** (`GET` stream + `POST` submit under a shared base path) with a
//!   process-wide session registry, per-session tool filters, and bounded
//!   emit queues;
//! - **streamable HTTP** (single `POST`, one request → one response) for
//!   deployments that cannot hold long-lived connections.
//!
//! Both terminate in the same JSON-RPC dispatcher built by
//! `jakarta-mcp-server`.

pub mod server;
pub mod session;
pub mod sse;
pub mod streamable;
pub mod util;

pub use server::{HttpMcpServer, HttpServerConfig, StreamConfig};
pub use session::{SessionRegistry, SseEvent, SseSession};
pub use sse::{SESSION_ID_HEADER, SseHandler};
pub use streamable::StreamableHttpHandler;
