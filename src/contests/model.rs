//! Contest records and immutable snapshots.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// A single scheduled contest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contest {
    /// Upstream contest id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Scheduled start; `None` when the upstream has no confirmed date.
    pub start: Option<DateTime<Utc>>,
    /// Contest length in seconds.
    pub duration_secs: u64,
}

/// Point-in-time view of future contests.
///
/// Contests are sorted ascending by start. A snapshot is never mutated after
/// [`Snapshot::build`]; the cache replaces it wholesale.
#[derive(Debug, Clone)]
pub struct Snapshot {
    contests: Vec<Contest>,
    by_id: HashMap<i64, usize>,
    created_at: DateTime<Utc>,
}

impl Snapshot {
    /// Build a snapshot from an upstream contest list.
    ///
    /// Only contests with a start strictly after `now` are kept. Ties on the
    /// start time keep upstream order.
    pub fn build(contests: Vec<Contest>, now: DateTime<Utc>) -> Self {
        let mut future: Vec<Contest> = contests
            .into_iter()
            .filter(|c| c.start.is_some_and(|start| start > now))
            .collect();
        future.sort_by_key(|c| c.start);

        let by_id = future
            .iter()
            .enumerate()
            .map(|(idx, contest)| (contest.id, idx))
            .collect();

        Self {
            contests: future,
            by_id,
            created_at: now,
        }
    }

    /// Contests ordered by start time.
    pub fn contests(&self) -> &[Contest] {
        &self.contests
    }

    /// Look up a contest by id.
    pub fn get(&self, id: i64) -> Option<&Contest> {
        self.by_id.get(&id).and_then(|&idx| self.contests.get(idx))
    }

    pub fn len(&self) -> usize {
        self.contests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contests.is_empty()
    }

    /// When this snapshot was built.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Time elapsed since this snapshot was built.
    pub fn age(&self) -> chrono::Duration {
        Utc::now().signed_duration_since(self.created_at)
    }
}
