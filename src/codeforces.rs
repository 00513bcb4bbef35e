//! Upstream contest list source.
//!
//! The cache only depends on the [`ContestSource`] trait; [`CodeforcesClient`]
//! is the production implementation over the public Codeforces API.

use crate::config::UpstreamConfig;
use crate::contests::Contest;
use crate::error::{Result, WatchError};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::Deserialize;

/// Anything that can produce the current upstream contest list.
#[async_trait]
pub trait ContestSource: Send + Sync {
    /// Fetch every contest the upstream knows about.
    ///
    /// Network errors, non-success responses and malformed payloads are all
    /// reported as [`WatchError::Fetch`].
    async fn fetch_contests(&self) -> Result<Vec<Contest>>;
}

/// `contest.list` response envelope.
#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    status: String,
    #[serde(default)]
    comment: Option<String>,
    #[serde(default)]
    result: Option<Vec<ApiContest>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiContest {
    id: i64,
    name: String,
    #[serde(default)]
    start_time_seconds: Option<i64>,
    duration_seconds: u64,
}

impl ApiContest {
    fn into_contest(self) -> Contest {
        Contest {
            id: self.id,
            name: self.name,
            start: self
                .start_time_seconds
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
            duration_secs: self.duration_seconds,
        }
    }
}

/// Codeforces `contest.list` client.
pub struct CodeforcesClient {
    base_url: String,
    client: reqwest::Client,
}

impl CodeforcesClient {
    pub fn new(config: &UpstreamConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            client: reqwest::Client::new(),
        }
    }

    fn list_url(&self) -> String {
        format!("{}/api/contest.list", self.base_url)
    }
}

#[async_trait]
impl ContestSource for CodeforcesClient {
    async fn fetch_contests(&self) -> Result<Vec<Contest>> {
        let response = self
            .client
            .get(self.list_url())
            .query(&[("gym", "false")])
            .send()
            .await
            .map_err(|e| WatchError::Fetch(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WatchError::Fetch(format!("upstream returned {status}")));
        }

        let envelope: ApiEnvelope = response
            .json()
            .await
            .map_err(|e| WatchError::Fetch(format!("malformed contest list: {e}")))?;

        if envelope.status != "OK" {
            let comment = envelope.comment.unwrap_or_default();
            return Err(WatchError::Fetch(format!(
                "upstream status {}: {comment}",
                envelope.status
            )));
        }

        let records = envelope
            .result
            .ok_or_else(|| WatchError::Fetch("contest list missing result".to_owned()))?;

        Ok(records.into_iter().map(ApiContest::into_contest).collect())
    }
}
