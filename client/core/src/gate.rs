//! Pause Gate
//!
//! A binary cooperative gate used to suspend interpretation of an in-flight
//! stream without dropping data, plus an independent cancel flag.
//!
//! The session awaits the gate before applying each stream event. Pausing
//! only defers interpretation of data already read; it does not push back on
//! the transport. Waiters are woken through a [`Notify`] on resume or
//! cancel, with a bounded re-check interval as a safety net so a cancel can
//! never be missed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;

/// Upper bound on how long a suspended waiter sleeps before re-checking the
/// cancel flag. Wakeups normally arrive immediately via notification.
pub const GATE_RECHECK_INTERVAL: Duration = Duration::from_millis(100);

/// Result of waiting on the gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateStatus {
    /// The gate is open; the caller may apply the next event.
    Ready,
    /// The exchange was cancelled before or while waiting.
    Cancelled,
}

/// Cooperative pause/cancel gate for one streaming exchange.
///
/// The gate starts open. Cancellation always wins over pause state.
#[derive(Debug, Default)]
pub struct PauseGate {
    paused: AtomicBool,
    cancelled: AtomicBool,
    notify: Notify,
}

impl PauseGate {
    /// Create an open, uncancelled gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Close the gate. Waiters suspend until resume or cancel.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    /// Open the gate and wake any waiter.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Set the cancel flag and wake any waiter. Irreversible.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Whether the gate is currently closed.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Whether the exchange has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Wait until the gate is open or the exchange is cancelled.
    ///
    /// Returns [`GateStatus::Cancelled`] within one re-check interval of a
    /// cancel issued mid-wait.
    pub async fn wait_ready(&self) -> GateStatus {
        loop {
            if self.is_cancelled() {
                return GateStatus::Cancelled;
            }
            if !self.is_paused() {
                return GateStatus::Ready;
            }
            let _ = tokio::time::timeout(GATE_RECHECK_INTERVAL, self.notify.notified()).await;
        }
    }

    /// Wait until the exchange is cancelled.
    ///
    /// Used to abandon a stalled transport read promptly on stop.
    pub async fn cancelled(&self) {
        loop {
            if self.is_cancelled() {
                return;
            }
            let _ = tokio::time::timeout(GATE_RECHECK_INTERVAL, self.notify.notified()).await;
        }
    }
}
