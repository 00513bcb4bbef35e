//! Shared test utilities used across multiple test modules.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::codeforces::ContestSource;
use crate::contests::Contest;
use crate::error::{Result, WatchError};
use crate::pages::{ACCENT_COLORS, Page, PageEntry};
use crate::present::{OutputId, PresentError, Presenter};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Contest named `Round {id}` starting at the given unix second.
pub fn contest(id: i64, start_secs: Option<i64>, duration_secs: u64) -> Contest {
    Contest {
        id,
        name: format!("Round {id}"),
        start: start_secs.map(|s| Utc.timestamp_opt(s, 0).unwrap()),
        duration_secs,
    }
}

/// One scripted upstream response.
pub enum Scripted {
    Ok(Vec<Contest>),
    Fail,
    /// Never resolves; exercises the fetch timeout.
    Hang,
}

/// Contest source replaying a fixed script, then repeating the last entry.
pub struct ScriptedSource {
    script: Mutex<VecDeque<Scripted>>,
    pub calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(script: Vec<Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ContestSource for ScriptedSource {
    async fn fetch_contests(&self) -> Result<Vec<Contest>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = {
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().map(|s| match s {
                    Scripted::Ok(list) => Scripted::Ok(list.clone()),
                    Scripted::Fail => Scripted::Fail,
                    Scripted::Hang => Scripted::Hang,
                })
            }
        };
        match step {
            Some(Scripted::Ok(list)) => Ok(list),
            Some(Scripted::Fail) | None => Err(WatchError::Fetch("scripted failure".to_owned())),
            Some(Scripted::Hang) => std::future::pending().await,
        }
    }
}

/// One call observed by [`RecordingPresenter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresentCall {
    Publish {
        target: String,
        index: usize,
        controls: bool,
    },
    Update {
        output: OutputId,
        index: usize,
    },
    Freeze {
        output: OutputId,
    },
    Notify {
        target: String,
        text: String,
    },
}

/// In-memory presenter that records every call.
#[derive(Default)]
pub struct RecordingPresenter {
    calls: Mutex<Vec<PresentCall>>,
    next_message: AtomicUsize,
    fail_publish: AtomicBool,
    fail_updates: AtomicBool,
}

impl RecordingPresenter {
    pub fn calls(&self) -> Vec<PresentCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    /// Make every later `publish` fail.
    pub fn fail_publish(&self) {
        self.fail_publish.store(true, Ordering::SeqCst);
    }

    /// Make every later `update` fail as if the output was deleted.
    pub fn fail_updates(&self) {
        self.fail_updates.store(true, Ordering::SeqCst);
    }

    fn record(&self, call: PresentCall) {
        self.calls.lock().expect("calls lock").push(call);
    }
}

#[async_trait]
impl Presenter for RecordingPresenter {
    async fn publish(
        &self,
        target: &str,
        page: &Page,
        controls: bool,
    ) -> std::result::Result<OutputId, PresentError> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(PresentError::Transport("publish refused".to_owned()));
        }
        self.record(PresentCall::Publish {
            target: target.to_owned(),
            index: page.index,
            controls,
        });
        let message = self.next_message.fetch_add(1, Ordering::SeqCst);
        Ok(OutputId::new(target, format!("msg-{message}")))
    }

    async fn update(
        &self,
        output: &OutputId,
        page: &Page,
    ) -> std::result::Result<(), PresentError> {
        self.record(PresentCall::Update {
            output: output.clone(),
            index: page.index,
        });
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(PresentError::Gone);
        }
        Ok(())
    }

    async fn freeze(&self, output: &OutputId) -> std::result::Result<(), PresentError> {
        self.record(PresentCall::Freeze {
            output: output.clone(),
        });
        Ok(())
    }

    async fn notify(&self, target: &str, text: &str) -> std::result::Result<(), PresentError> {
        self.record(PresentCall::Notify {
            target: target.to_owned(),
            text: text.to_owned(),
        });
        Ok(())
    }
}

/// `n` single-entry pages indexed `0..n`.
pub fn pages(n: usize) -> Vec<Page> {
    (0..n)
        .map(|index| Page {
            title: "Test".to_owned(),
            entries: vec![PageEntry {
                name: format!("Contest {index}"),
                id: index as i64,
                start: "01 Jan 24, 00:00 UTC".to_owned(),
                duration: "2h 0m".to_owned(),
                url: format!("https://example.test/{index}"),
            }],
            index,
            total: n,
            notice: None,
            color: ACCENT_COLORS[index % ACCENT_COLORS.len()],
        })
        .collect()
}
