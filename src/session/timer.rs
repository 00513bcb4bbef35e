//! Cancellable per-session expiry timer.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio::time::Instant;

/// Sliding deadline that posts `message` to `fire_tx` when it elapses.
///
/// Re-arming aborts the pending wake-up and starts a new one. A wake-up that
/// was already queued before a reset can still arrive, so receivers must
/// confirm with [`ExpiryTimer::is_expired`] before acting on it.
pub struct ExpiryTimer<T: Clone + Send + 'static> {
    timeout: Duration,
    deadline: Option<Instant>,
    pending: Option<AbortHandle>,
    fire_tx: mpsc::UnboundedSender<T>,
    message: T,
}

impl<T: Clone + Send + 'static> ExpiryTimer<T> {
    /// Create a disarmed timer.
    pub fn new(timeout: Duration, fire_tx: mpsc::UnboundedSender<T>, message: T) -> Self {
        Self {
            timeout,
            deadline: None,
            pending: None,
            fire_tx,
            message,
        }
    }

    /// Arm the timer at `now + timeout`, replacing any earlier deadline.
    pub fn arm(&mut self) -> Instant {
        self.abort_pending();
        let deadline = Instant::now() + self.timeout;
        let fire_tx = self.fire_tx.clone();
        let message = self.message.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let _ = fire_tx.send(message);
        });
        self.pending = Some(task.abort_handle());
        self.deadline = Some(deadline);
        deadline
    }

    /// Push the deadline forward by a full timeout from now.
    pub fn reset(&mut self) -> Instant {
        self.arm()
    }

    /// Disarm the timer. No wake-up is posted after this returns.
    pub fn cancel(&mut self) {
        self.abort_pending();
        self.deadline = None;
    }

    /// Whether the armed deadline has passed at `now`.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    fn abort_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}

impl<T: Clone + Send + 'static> Drop for ExpiryTimer<T> {
    fn drop(&mut self) {
        self.abort_pending();
    }
}
