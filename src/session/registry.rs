//! Session registry and navigation dispatcher.
//!
//! All sessions live on one dispatcher task. Opens, navigation events and
//! expiry wake-ups arrive on channels and are handled one at a time, so a
//! session's index change and re-render never interleave with another event
//! for the same session. Closed sessions are dropped immediately, which also
//! drops their timers.

use crate::config::SameTargetPolicy;
use crate::error::{Result, WatchError};
use crate::pages::Page;
use crate::present::{OutputId, Presenter};
use crate::session::pagination::PaginationSession;
use crate::session::{NavEvent, SessionState};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Bound on queued registry commands.
const COMMAND_QUEUE_CAPACITY: usize = 256;

/// Point-in-time view of a live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStatus {
    pub index: usize,
    pub total: usize,
    pub state: SessionState,
}

enum RegistryCommand {
    Open {
        target: String,
        pages: Vec<Page>,
        reply: oneshot::Sender<Result<OutputId>>,
    },
    Navigate {
        output: OutputId,
        event: NavEvent,
    },
    Status {
        output: OutputId,
        reply: oneshot::Sender<Option<SessionStatus>>,
    },
    Count {
        reply: oneshot::Sender<usize>,
    },
}

/// Cloneable handle for talking to the registry task.
#[derive(Clone)]
pub struct RegistryHandle {
    tx: mpsc::Sender<RegistryCommand>,
}

impl RegistryHandle {
    /// Open a new paginated session in `target`.
    pub async fn open(&self, target: &str, pages: Vec<Page>) -> Result<OutputId> {
        let (reply, rx) = oneshot::channel();
        self.send(RegistryCommand::Open {
            target: target.to_owned(),
            pages,
            reply,
        })
        .await?;
        rx.await
            .map_err(|_| WatchError::Channel("registry dropped open reply".to_owned()))?
    }

    /// Route a navigation event to the session bound to `output`.
    pub async fn navigate(&self, output: OutputId, event: NavEvent) -> Result<()> {
        self.send(RegistryCommand::Navigate { output, event }).await
    }

    /// Status of the live session bound to `output`, if any.
    pub async fn status(&self, output: &OutputId) -> Result<Option<SessionStatus>> {
        let (reply, rx) = oneshot::channel();
        self.send(RegistryCommand::Status {
            output: output.clone(),
            reply,
        })
        .await?;
        rx.await
            .map_err(|_| WatchError::Channel("registry dropped status reply".to_owned()))
    }

    /// Number of live sessions.
    pub async fn active_count(&self) -> Result<usize> {
        let (reply, rx) = oneshot::channel();
        self.send(RegistryCommand::Count { reply }).await?;
        rx.await
            .map_err(|_| WatchError::Channel("registry dropped count reply".to_owned()))
    }

    async fn send(&self, command: RegistryCommand) -> Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| WatchError::Channel("session registry stopped".to_owned()))
    }
}

/// Owns every live [`PaginationSession`].
pub struct SessionRegistry {
    sessions: HashMap<OutputId, PaginationSession>,
    presenter: Arc<dyn Presenter>,
    timeout: Duration,
    policy: SameTargetPolicy,
    expiry_tx: mpsc::UnboundedSender<OutputId>,
    cancel: CancellationToken,
}

impl SessionRegistry {
    /// Spawn the dispatcher task and return a handle to it.
    ///
    /// The task exits when `cancel` fires; live sessions are then dropped
    /// without further rendering.
    pub fn spawn(
        presenter: Arc<dyn Presenter>,
        timeout: Duration,
        policy: SameTargetPolicy,
        cancel: CancellationToken,
    ) -> (RegistryHandle, tokio::task::JoinHandle<()>) {
        let (tx, commands) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        let (expiry_tx, expiries) = mpsc::unbounded_channel();
        let registry = Self {
            sessions: HashMap::new(),
            presenter,
            timeout,
            policy,
            expiry_tx,
            cancel,
        };
        let handle = tokio::spawn(registry.run(commands, expiries));
        (RegistryHandle { tx }, handle)
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<RegistryCommand>,
        mut expiries: mpsc::UnboundedReceiver<OutputId>,
    ) {
        debug!("session registry started");
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                Some(output) = expiries.recv() => self.on_expiry(output).await,
                command = commands.recv() => match command {
                    Some(command) => self.on_command(command).await,
                    None => break,
                },
            }
        }
        self.shutdown();
    }

    async fn on_command(&mut self, command: RegistryCommand) {
        match command {
            RegistryCommand::Open {
                target,
                pages,
                reply,
            } => {
                let opened = self.open(&target, pages).await;
                let _ = reply.send(opened);
            }
            RegistryCommand::Navigate { output, event } => self.navigate(output, event).await,
            RegistryCommand::Status { output, reply } => {
                let status = self.sessions.get(&output).map(|s| SessionStatus {
                    index: s.index(),
                    total: s.page_count(),
                    state: s.state(),
                });
                let _ = reply.send(status);
            }
            RegistryCommand::Count { reply } => {
                let _ = reply.send(self.sessions.len());
            }
        }
    }

    async fn open(&mut self, target: &str, pages: Vec<Page>) -> Result<OutputId> {
        if self.policy == SameTargetPolicy::Replace {
            let stale: Vec<OutputId> = self
                .sessions
                .keys()
                .filter(|output| output.channel_id == target)
                .cloned()
                .collect();
            for output in stale {
                if let Some(mut session) = self.sessions.remove(&output) {
                    debug!(session = %output, "replacing session in {target}");
                    session.close(self.presenter.as_ref()).await;
                }
            }
        }

        let session = PaginationSession::create(
            pages,
            self.timeout,
            target,
            self.presenter.as_ref(),
            self.expiry_tx.clone(),
        )
        .await?;
        let output = session.output().clone();
        self.sessions.insert(output.clone(), session);
        Ok(output)
    }

    async fn navigate(&mut self, output: OutputId, event: NavEvent) {
        let Some(session) = self.sessions.get_mut(&output) else {
            debug!(session = %output, ?event, "navigation for unknown session");
            return;
        };
        if session.handle(event, self.presenter.as_ref()).await == SessionState::Closed {
            self.sessions.remove(&output);
        }
    }

    async fn on_expiry(&mut self, output: OutputId) {
        let Some(session) = self.sessions.get_mut(&output) else {
            return;
        };
        if session
            .expire(Instant::now(), self.presenter.as_ref())
            .await
        {
            self.sessions.remove(&output);
        }
    }

    fn shutdown(&mut self) {
        let live = self.sessions.len();
        for session in self.sessions.values_mut() {
            session.abandon();
        }
        self.sessions.clear();
        if live > 0 {
            warn!("session registry stopped with {live} live sessions");
        } else {
            info!("session registry stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::test_utils::{PresentCall, RecordingPresenter, pages};

    const T: Duration = Duration::from_secs(300);

    fn spawn(
        policy: SameTargetPolicy,
    ) -> (
        Arc<RecordingPresenter>,
        RegistryHandle,
        CancellationToken,
        tokio::task::JoinHandle<()>,
    ) {
        let presenter = Arc::new(RecordingPresenter::default());
        let cancel = CancellationToken::new();
        let (handle, task) = SessionRegistry::spawn(presenter.clone(), T, policy, cancel.clone());
        (presenter, handle, cancel, task)
    }

    #[tokio::test(start_paused = true)]
    async fn routes_events_to_the_right_session() {
        let (_presenter, registry, _cancel, _task) = spawn(SameTargetPolicy::Coexist);

        let a = registry.open("chan-a", pages(3)).await.expect("open a");
        let b = registry.open("chan-b", pages(4)).await.expect("open b");

        registry.navigate(a.clone(), NavEvent::Next).await.expect("nav");
        registry.navigate(b.clone(), NavEvent::Last).await.expect("nav");

        let status_a = registry.status(&a).await.expect("status").expect("live");
        let status_b = registry.status(&b).await.expect("status").expect("live");
        assert_eq!(status_a.index, 1);
        assert_eq!(status_b.index, 3);
        assert_eq!(status_b.total, 4);
        assert_eq!(registry.active_count().await.expect("count"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn sliding_expiry_follows_last_event() {
        let (presenter, registry, _cancel, _task) = spawn(SameTargetPolicy::Replace);
        let output = registry.open("chan", pages(3)).await.expect("open");

        tokio::time::sleep(T - Duration::from_secs(1)).await;
        registry.navigate(output.clone(), NavEvent::Next).await.expect("nav");

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        let status = registry.status(&output).await.expect("status");
        assert_eq!(status.map(|s| s.state), Some(SessionState::Active));

        tokio::time::sleep(T - Duration::from_secs(2)).await;
        assert!(registry.status(&output).await.expect("status").is_some());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(registry.status(&output).await.expect("status").is_none());
        assert_eq!(registry.active_count().await.expect("count"), 0);
        assert!(matches!(
            presenter.calls().last(),
            Some(PresentCall::Freeze { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn close_event_removes_session() {
        let (presenter, registry, _cancel, _task) = spawn(SameTargetPolicy::Replace);
        let output = registry.open("chan", pages(2)).await.expect("open");

        registry.navigate(output.clone(), NavEvent::Close).await.expect("nav");
        assert!(registry.status(&output).await.expect("status").is_none());

        registry.navigate(output.clone(), NavEvent::Next).await.expect("nav");
        assert_eq!(registry.active_count().await.expect("count"), 0);

        let renders = presenter
            .calls()
            .iter()
            .filter(|c| matches!(c, PresentCall::Update { .. }))
            .count();
        assert_eq!(renders, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn render_failure_drops_session() {
        let (presenter, registry, _cancel, _task) = spawn(SameTargetPolicy::Replace);
        let output = registry.open("chan", pages(2)).await.expect("open");
        presenter.fail_updates();

        registry.navigate(output.clone(), NavEvent::Next).await.expect("nav");
        assert!(registry.status(&output).await.expect("status").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn replace_policy_freezes_older_session_in_same_channel() {
        let (presenter, registry, _cancel, _task) = spawn(SameTargetPolicy::Replace);
        let first = registry.open("chan", pages(2)).await.expect("open");
        let other = registry.open("elsewhere", pages(2)).await.expect("open");
        let second = registry.open("chan", pages(2)).await.expect("open");

        assert!(registry.status(&first).await.expect("status").is_none());
        assert!(registry.status(&other).await.expect("status").is_some());
        assert!(registry.status(&second).await.expect("status").is_some());
        assert!(
            presenter
                .calls()
                .contains(&PresentCall::Freeze { output: first })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn coexist_policy_keeps_both_sessions() {
        let (_presenter, registry, _cancel, _task) = spawn(SameTargetPolicy::Coexist);
        registry.open("chan", pages(2)).await.expect("open");
        registry.open("chan", pages(2)).await.expect("open");
        assert_eq!(registry.active_count().await.expect("count"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn open_with_no_pages_is_rejected() {
        let (_presenter, registry, _cancel, _task) = spawn(SameTargetPolicy::Replace);
        let result = registry.open("chan", Vec::new()).await;
        assert!(matches!(result, Err(WatchError::NoPages)));
        assert_eq!(registry.active_count().await.expect("count"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_rendering_and_timers() {
        let (presenter, registry, cancel, task) = spawn(SameTargetPolicy::Replace);
        registry.open("chan", pages(2)).await.expect("open");
        let before = presenter.calls().len();

        cancel.cancel();
        task.await.expect("registry exits");

        tokio::time::sleep(T * 2).await;
        assert_eq!(presenter.calls().len(), before);
        assert!(registry.active_count().await.is_err());
    }
}
