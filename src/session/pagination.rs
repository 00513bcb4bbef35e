//! Paginated view state machine.
//!
//! A session is bound to one rendered output. It starts `Active` on page 0
//! and ends `Closed` on explicit close, inactivity expiry, or a failed
//! re-render. Navigation clamps at both ends and every accepted event slides
//! the expiry deadline.

use crate::error::{Result, WatchError};
use crate::pages::Page;
use crate::present::{OutputId, PresentError, Presenter};
use crate::session::timer::ExpiryTimer;
use crate::session::{NavEvent, SessionState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// One interactive paginated output.
pub struct PaginationSession {
    output: OutputId,
    pages: Arc<[Page]>,
    index: usize,
    state: SessionState,
    timer: ExpiryTimer<OutputId>,
}

impl PaginationSession {
    /// Publish page 0 to `target` and arm the expiry timer.
    ///
    /// When the deadline elapses the session's [`OutputId`] is posted to
    /// `expiry_tx`; the owner then calls [`PaginationSession::expire`].
    pub async fn create(
        pages: Vec<Page>,
        timeout: Duration,
        target: &str,
        presenter: &dyn Presenter,
        expiry_tx: mpsc::UnboundedSender<OutputId>,
    ) -> Result<Self> {
        let Some(first) = pages.first() else {
            return Err(WatchError::NoPages);
        };

        let output = presenter
            .publish(target, first, true)
            .await
            .map_err(|e| WatchError::SessionIo(e.to_string()))?;

        let mut timer = ExpiryTimer::new(timeout, expiry_tx, output.clone());
        timer.arm();

        info!(session = %output, pages = pages.len(), "pagination session opened");
        Ok(Self {
            output,
            pages: pages.into(),
            index: 0,
            state: SessionState::Active,
            timer,
        })
    }

    pub fn output(&self) -> &OutputId {
        &self.output
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Current expiry deadline, `None` once closed.
    pub fn deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    fn last_index(&self) -> usize {
        self.pages.len().saturating_sub(1)
    }

    fn target_index(&self, event: NavEvent) -> usize {
        let last = self.last_index();
        match event {
            NavEvent::First => 0,
            NavEvent::Previous => self.index.saturating_sub(1),
            NavEvent::Next => (self.index + 1).min(last),
            NavEvent::Last => last,
            NavEvent::Jump(n) => n.min(last),
            NavEvent::Close => self.index,
        }
    }

    /// Apply a navigation event and re-render.
    ///
    /// Ignored once closed. A failed re-render closes the session without
    /// retrying.
    pub async fn handle(&mut self, event: NavEvent, presenter: &dyn Presenter) -> SessionState {
        if !self.is_active() {
            debug!(session = %self.output, ?event, "ignoring event for closed session");
            return self.state;
        }
        if event == NavEvent::Close {
            self.close(presenter).await;
            return self.state;
        }

        self.index = self.target_index(event);
        self.timer.reset();

        if let Err(e) = presenter.update(&self.output, &self.pages[self.index]).await {
            self.fail(&e);
        }
        self.state
    }

    /// Close now and strip navigation controls from the output.
    pub async fn close(&mut self, presenter: &dyn Presenter) {
        if !self.is_active() {
            return;
        }
        self.state = SessionState::Closed;
        self.timer.cancel();

        if let Err(e) = presenter.freeze(&self.output).await {
            warn!(session = %self.output, "could not strip controls: {e}");
        }
        info!(session = %self.output, "pagination session closed");
    }

    /// Close if the deadline has passed at `now`. Returns `true` when closed.
    ///
    /// A stale wake-up (one that raced a navigation event) is ignored.
    pub async fn expire(&mut self, now: Instant, presenter: &dyn Presenter) -> bool {
        if !self.is_active() || !self.timer.is_expired(now) {
            return false;
        }
        debug!(session = %self.output, "pagination session expired");
        self.close(presenter).await;
        true
    }

    /// Close without touching the output (shutdown in progress).
    pub fn abandon(&mut self) {
        self.state = SessionState::Closed;
        self.timer.cancel();
    }

    fn fail(&mut self, error: &PresentError) {
        self.state = SessionState::Closed;
        self.timer.cancel();
        match error {
            PresentError::Gone => {
                warn!(session = %self.output, "output disappeared; closing session")
            }
            PresentError::Transport(msg) => {
                warn!(session = %self.output, "re-render failed, closing session: {msg}")
            }
        }
    }
}
