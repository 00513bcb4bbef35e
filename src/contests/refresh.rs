//! Periodic contest cache refresh loop.
//!
//! Performs one refresh at startup, then refreshes on a fixed interval until
//! cancelled. Each cycle runs in its own task so a panic inside one refresh
//! is logged and the loop carries on.

use crate::contests::cache::ContestCache;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Drives periodic [`ContestCache::refresh`] calls.
pub struct RefreshScheduler {
    cache: Arc<ContestCache>,
    interval: Duration,
    cancel: CancellationToken,
}

impl RefreshScheduler {
    /// Create a scheduler that refreshes `cache` every `interval`.
    pub fn new(cache: Arc<ContestCache>, interval: Duration, cancel: CancellationToken) -> Self {
        Self {
            cache,
            interval,
            cancel,
        }
    }

    /// Run the initial refresh, then spawn the periodic loop.
    ///
    /// The returned handle completes once the cancellation token fires.
    pub async fn start(self) -> tokio::task::JoinHandle<()> {
        if !self.run_cycle().await {
            warn!("initial contest refresh failed; serving no data until the next cycle");
        }
        self.spawn_loop()
    }

    fn spawn_loop(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "contest refresh loop started (every {}s)",
                self.interval.as_secs()
            );
            let start = tokio::time::Instant::now() + self.interval;
            let mut interval = tokio::time::interval_at(start, self.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = self.cancel.cancelled() => {
                        info!("contest refresh loop stopped");
                        return;
                    }
                    _ = interval.tick() => {
                        self.run_cycle().await;
                    }
                }
            }
        })
    }

    /// Execute one refresh cycle, isolating panics from the caller.
    async fn run_cycle(&self) -> bool {
        let cache = Arc::clone(&self.cache);
        let cycle = tokio::spawn(async move { cache.refresh().await });
        let abort = cycle.abort_handle();

        tokio::select! {
            _ = self.cancel.cancelled() => {
                abort.abort();
                debug!("refresh cycle abandoned on shutdown");
                false
            }
            joined = cycle => match joined {
                Ok(updated) => updated,
                Err(e) if e.is_panic() => {
                    error!("contest refresh panicked: {e}");
                    false
                }
                Err(e) => {
                    warn!("contest refresh task cancelled: {e}");
                    false
                }
            },
        }
    }
}
