//! Metered billing sink.
//!
//! Premium tool calls emit one billing event after a successful run. The
//! sink keeps a running charge total and refuses emissions past the
//! configured cap; callers treat refusal as a silent success.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("billing cap of {cap} events reached")]
    CapReached { cap: u64 },

    #[error("billing sink rejected event '{0}'")]
    Rejected(String),
}

/// Destination for billing events. Implementations may forward to an
/// external metering API; the bundled implementation just counts.
pub trait BillingSink: Send + Sync {
    fn emit(&self, event: &str) -> Result<(), BillingError>;

    /// Total events accepted so far
    fn metered_usage(&self) -> u64;
}

/// In-process sink with an atomic charge counter and an optional cap.
pub struct MeteredBillingSink {
    enabled: AtomicBool,
    emitted: AtomicU64,
    cap: Option<u64>,
}

impl MeteredBillingSink {
    pub fn new(enabled: bool, cap: Option<u64>) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            emitted: AtomicU64::new(0),
            cap,
        }
    }

    pub fn disabled() -> Self {
        Self::new(false, None)
    }
}

impl BillingSink for MeteredBillingSink {
    fn emit(&self, event: &str) -> Result<(), BillingError> {
        if !self.enabled.load(Ordering::Relaxed) {
            debug!(event, "billing disabled, dropping event");
            return Ok(());
        }
        if let Some(cap) = self.cap {
            // fetch_update keeps the counter at the cap under concurrent emits.
            let updated = self
                .emitted
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                    (current < cap).then_some(current + 1)
                });
            if updated.is_err() {
                warn!(event, cap, "billing cap reached, refusing emission");
                return Err(BillingError::CapReached { cap });
            }
        } else {
            self.emitted.fetch_add(1, Ordering::SeqCst);
        }
        debug!(event, "billing event emitted");
        Ok(())
    }

    fn metered_usage(&self) -> u64 {
        self.emitted.load(Ordering::SeqCst)
    }
}
