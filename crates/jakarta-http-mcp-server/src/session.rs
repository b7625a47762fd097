//! SSE session registry.
//!
//! One record per open event stream. The registry is process-wide mutable
//! state under a lock; each session's emitter is a bounded channel whose
//! single consumer is the stream task, so writes to one stream are
//! naturally serialised. Overflowing the channel closes the session.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// One outbound SSE frame
#[derive(Debug, Clone)]
pub enum SseEvent {
    /// A JSON-RPC payload delivered as a `message` event
    Message(Value),
    /// Comment frame keeping intermediaries from reaping the stream
    KeepAlive,
}

impl SseEvent {
    /// Render as a `text/event-stream` chunk
    pub fn format(&self) -> String {
        match self {
            SseEvent::Message(data) => format!(
                "event: message\ndata: {}\n\n",
                serde_json::to_string(data).unwrap_or_else(|_| "{}".to_string())
            ),
            SseEvent::KeepAlive => ": keepalive\n\n".to_string(),
        }
    }
}

/// Server-side record of one SSE connection
pub struct SseSession {
    pub session_id: String,
    emitter: mpsc::Sender<SseEvent>,
    pub created_at: DateTime<Utc>,
    last_activity: RwLock<DateTime<Utc>>,
    /// Explicit tool-name filter; `None` means every tool is visible
    pub tool_filter: Option<HashSet<String>>,
}

impl SseSession {
    pub fn last_activity(&self) -> DateTime<Utc> {
        *self.last_activity.read().expect("activity lock poisoned")
    }

    fn touch(&self) {
        *self.last_activity.write().expect("activity lock poisoned") = Utc::now();
    }
}

/// Why an emit attempt did not reach the stream
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    #[error("session emit queue full")]
    QueueFull,

    #[error("session stream closed")]
    Closed,
}

/// Process-wide registry of live SSE sessions.
///
/// A `std::sync` lock keeps removal available from synchronous contexts
/// (stream teardown guards); every critical section is a map operation.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<SseSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session and hand back the receiving half of its
    /// emitter channel for the stream task.
    pub fn insert(
        &self,
        session_id: String,
        tool_filter: Option<HashSet<String>>,
        queue_capacity: usize,
    ) -> (Arc<SseSession>, mpsc::Receiver<SseEvent>) {
        let (emitter, receiver) = mpsc::channel(queue_capacity);
        let session = Arc::new(SseSession {
            session_id: session_id.clone(),
            emitter,
            created_at: Utc::now(),
            last_activity: RwLock::new(Utc::now()),
            tool_filter,
        });
        let mut sessions = self.sessions.write().expect("session lock poisoned");
        sessions.insert(session_id, session.clone());
        (session, receiver)
    }

    /// Remove a session; dropping its emitter ends the stream. Removal is
    /// idempotent so completion, timeout, and error callbacks may race.
    pub fn remove(&self, session_id: &str) {
        let mut sessions = self.sessions.write().expect("session lock poisoned");
        if sessions.remove(session_id).is_some() {
            debug!(session_id, "SSE session removed");
        }
    }

    pub fn get(&self, session_id: &str) -> Option<Arc<SseSession>> {
        let sessions = self.sessions.read().expect("session lock poisoned");
        sessions.get(session_id).cloned()
    }

    /// An arbitrary live session, for POSTs that carry no session header.
    pub fn first_available(&self) -> Option<Arc<SseSession>> {
        let sessions = self.sessions.read().expect("session lock poisoned");
        sessions.values().next().cloned()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().expect("session lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queue an event on a session's stream without blocking. Overflow or
    /// a closed stream removes the session.
    pub fn emit(&self, session: &SseSession, event: SseEvent) -> Result<(), EmitError> {
        match session.emitter.try_send(event) {
            Ok(()) => {
                session.touch();
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(session_id = %session.session_id, "emit queue overflow, closing session");
                self.remove(&session.session_id);
                Err(EmitError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.remove(&session.session_id);
                Err(EmitError::Closed)
            }
        }
    }

    /// Drop sessions idle for longer than `expiry`. Called from the sweep
    /// task; returns how many were removed.
    pub fn expire_idle(&self, expiry: Duration) -> usize {
        let cutoff = Utc::now() - chrono::Duration::from_std(expiry).unwrap_or_default();
        let mut sessions = self.sessions.write().expect("session lock poisoned");
        let stale: Vec<String> = sessions
            .values()
            .filter(|s| s.last_activity() < cutoff)
            .map(|s| s.session_id.clone())
            .collect();
        for session_id in &stale {
            sessions.remove(session_id);
            debug!(%session_id, "SSE session expired");
        }
        stale.len()
    }
}

/// Removes the session when the stream task ends for any reason
/// (disconnect, overflow, sweep). Idempotent against explicit removal.
pub struct SessionGuard {
    registry: Arc<SessionRegistry>,
    session_id: String,
}

impl SessionGuard {
    pub fn new(registry: Arc<SessionRegistry>, session_id: String) -> Self {
        Self {
            registry,
            session_id,
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.remove(&self.session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_formatting() {
        let message = SseEvent::Message(json!({"jsonrpc": "2.0", "id": 1, "result": {}}));
        let chunk = message.format();
        assert!(chunk.starts_with("event: message\ndata: "));
        assert!(chunk.ends_with("\n\n"));

        let keepalive = SseEvent::KeepAlive.format();
        assert!(keepalive.starts_with(":"));
    }

    #[test]
    fn insert_lookup_remove() {
        let registry = SessionRegistry::new();
        let (session, _rx) = registry.insert("s1".to_string(), None, 4);
        assert_eq!(registry.len(), 1);
        assert!(registry.get("s1").is_some());

        registry.remove(&session.session_id);
        assert!(registry.get("s1").is_none());
        // Second removal is a no-op, not a panic.
        registry.remove("s1");
    }

    #[tokio::test]
    async fn emit_delivers_in_order() {
        let registry = SessionRegistry::new();
        let (session, mut rx) = registry.insert("s2".to_string(), None, 4);

        registry.emit(&session, SseEvent::Message(json!(1))).unwrap();
        registry.emit(&session, SseEvent::Message(json!(2))).unwrap();

        let SseEvent::Message(first) = rx.recv().await.unwrap() else {
            panic!("expected message");
        };
        let SseEvent::Message(second) = rx.recv().await.unwrap() else {
            panic!("expected message");
        };
        assert_eq!(first, json!(1));
        assert_eq!(second, json!(2));
    }

    #[tokio::test]
    async fn overflow_closes_session() {
        let registry = SessionRegistry::new();
        let (session, _rx) = registry.insert("s3".to_string(), None, 1);

        registry.emit(&session, SseEvent::KeepAlive).unwrap();
        let err = registry.emit(&session, SseEvent::KeepAlive).unwrap_err();
        assert!(matches!(err, EmitError::QueueFull));
        assert!(registry.get("s3").is_none());
    }

    #[tokio::test]
    async fn emit_to_dropped_receiver_closes_session() {
        let registry = SessionRegistry::new();
        let (session, rx) = registry.insert("s4".to_string(), None, 4);
        drop(rx);

        let err = registry.emit(&session, SseEvent::KeepAlive).unwrap_err();
        assert!(matches!(err, EmitError::Closed));
        assert!(registry.get("s4").is_none());
    }

    #[test]
    fn guard_removes_on_drop() {
        let registry = Arc::new(SessionRegistry::new());
        let (_session, _rx) = registry.insert("s5".to_string(), None, 4);
        {
            let _guard = SessionGuard::new(registry.clone(), "s5".to_string());
        }
        assert!(registry.get("s5").is_none());
    }

    #[test]
    fn expire_idle_removes_stale_sessions() {
        let registry = SessionRegistry::new();
        let (_session, _rx) = registry.insert("s6".to_string(), None, 4);
        assert_eq!(registry.expire_idle(Duration::from_secs(3600)), 0);
        assert_eq!(registry.expire_idle(Duration::ZERO), 1);
        assert!(registry.is_empty());
    }
}
