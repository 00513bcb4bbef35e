//! Failure-tolerant in-memory contest cache.
//!
//! Reads are wait-free `ArcSwap` loads. Writes are serialized by an async
//! mutex so only one refresh runs at a time; the new snapshot is published
//! with a single atomic store.

use crate::codeforces::ContestSource;
use crate::contests::model::{Contest, Snapshot};
use arc_swap::ArcSwapOption;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Holds the latest successfully fetched [`Snapshot`].
pub struct ContestCache {
    source: Arc<dyn ContestSource>,
    current: ArcSwapOption<Snapshot>,
    write_lock: Mutex<()>,
    fetch_timeout: Duration,
}

impl ContestCache {
    /// Create an empty cache backed by `source`.
    pub fn new(source: Arc<dyn ContestSource>, fetch_timeout: Duration) -> Self {
        Self {
            source,
            current: ArcSwapOption::empty(),
            write_lock: Mutex::new(()),
            fetch_timeout,
        }
    }

    /// Fetch the contest list and publish a new snapshot.
    ///
    /// Returns `false` and keeps the previous snapshot when the fetch fails,
    /// times out, or returns malformed data.
    pub async fn refresh(&self) -> bool {
        let _guard = self.write_lock.lock().await;

        let fetched =
            match tokio::time::timeout(self.fetch_timeout, self.source.fetch_contests()).await {
                Ok(Ok(contests)) => contests,
                Ok(Err(e)) => {
                    warn!("could not update contest cache: {e}");
                    return false;
                }
                Err(_) => {
                    warn!(
                        "could not update contest cache: fetch timed out after {}s",
                        self.fetch_timeout.as_secs()
                    );
                    return false;
                }
            };

        let total = fetched.len();
        let snapshot = Snapshot::build(fetched, Utc::now());
        info!(
            "contest cache updated: {} future of {} total",
            snapshot.len(),
            total
        );
        self.current.store(Some(Arc::new(snapshot)));
        true
    }

    /// Current snapshot, or `None` before the first successful refresh.
    pub fn get(&self) -> Option<Arc<Snapshot>> {
        self.current.load_full()
    }

    /// Look up a contest in the current snapshot.
    pub fn get_by_id(&self, id: i64) -> Option<Contest> {
        let guard = self.current.load();
        let found = guard.as_ref().and_then(|s| s.get(id)).cloned();
        if found.is_none() {
            debug!(contest_id = id, "contest not in cache");
        }
        found
    }
}
