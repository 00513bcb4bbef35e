//! The `future` command.
//!
//! With no arguments it opens a paginated listing of every upcoming contest.
//! With a contest id (and optionally a `±HH:MM` offset) it shows that one
//! contest's start time in the requested offset.

use crate::contests::ContestCache;
use crate::error::{Result, WatchError};
use crate::pages::{Page, PageBuilder};
use crate::present::{OutputId, Presenter};
use crate::session::RegistryHandle;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub const UNAVAILABLE_MESSAGE: &str = "Unable to connect to Codeforces API";
pub const UNKNOWN_CONTEST_MESSAGE: &str = "Contest ID not in contest list";
pub const BAD_TIMEZONE_MESSAGE: &str =
    "Timezone should be in valid format such as `-09:00` or `+05:30`";
pub const BAD_CONTEST_ID_MESSAGE: &str = "Contest ID should be a number";

/// Parsed `future` arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FutureQuery {
    pub contest_id: Option<i64>,
    pub offset: Option<String>,
}

impl FutureQuery {
    /// Parse whitespace-separated `[contest_id [offset]]`.
    ///
    /// Returns the rejection text on a non-numeric id.
    pub fn parse(args: &str) -> std::result::Result<Self, &'static str> {
        let mut parts = args.split_whitespace();
        let contest_id = match parts.next() {
            Some(raw) => Some(raw.parse::<i64>().map_err(|_| BAD_CONTEST_ID_MESSAGE)?),
            None => None,
        };
        let offset = parts.next().map(str::to_owned);
        Ok(Self { contest_id, offset })
    }
}

/// What a `future` invocation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FutureOutcome {
    /// A one-off output without controls.
    Published(OutputId),
    /// A paginated session bound to this output.
    Paginated(OutputId),
    /// The request was refused with this message.
    Rejected(&'static str),
    /// Shutdown began before anything was rendered.
    Abandoned,
}

/// Handles `future` requests against the shared cache.
pub struct FutureCommand {
    cache: Arc<ContestCache>,
    registry: RegistryHandle,
    presenter: Arc<dyn Presenter>,
    builder: PageBuilder,
    page_size: usize,
    cancel: CancellationToken,
}

impl FutureCommand {
    pub fn new(
        cache: Arc<ContestCache>,
        registry: RegistryHandle,
        presenter: Arc<dyn Presenter>,
        builder: PageBuilder,
        page_size: usize,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            cache,
            registry,
            presenter,
            builder,
            page_size,
            cancel,
        }
    }

    /// Answer one request in `target`.
    ///
    /// Nothing is rendered once `cancel` has fired.
    pub async fn run(&self, target: &str, query: &FutureQuery) -> Result<FutureOutcome> {
        let Some(snapshot) = self.cache.get() else {
            return self.reject(target, UNAVAILABLE_MESSAGE).await;
        };
        debug!(
            "serving snapshot built {}s ago",
            snapshot.age().num_seconds()
        );

        // An empty listing answers every query with the placeholder.
        if let Some(id) = query.contest_id.filter(|_| !snapshot.is_empty()) {
            let page = match self
                .builder
                .build_single_view(&snapshot, id, query.offset.as_deref())
            {
                Ok(page) => page,
                Err(WatchError::ContestNotFound(_)) => {
                    return self.reject(target, UNKNOWN_CONTEST_MESSAGE).await;
                }
                Err(WatchError::InvalidTimezoneFormat(_)) => {
                    return self.reject(target, BAD_TIMEZONE_MESSAGE).await;
                }
                Err(e) => return Err(e),
            };
            return self.publish_static(target, &page).await;
        }

        let pages = self.builder.build_pages(&snapshot, self.page_size);
        if let [page] = pages.as_slice() {
            return self.publish_static(target, page).await;
        }

        if self.cancel.is_cancelled() {
            return Ok(FutureOutcome::Abandoned);
        }
        let output = self.registry.open(target, pages).await?;
        Ok(FutureOutcome::Paginated(output))
    }

    /// Send a rejection notice to `target`.
    pub async fn reject(&self, target: &str, message: &'static str) -> Result<FutureOutcome> {
        if self.cancel.is_cancelled() {
            return Ok(FutureOutcome::Abandoned);
        }
        self.presenter
            .notify(target, message)
            .await
            .map_err(|e| WatchError::SessionIo(e.to_string()))?;
        Ok(FutureOutcome::Rejected(message))
    }

    async fn publish_static(&self, target: &str, page: &Page) -> Result<FutureOutcome> {
        if self.cancel.is_cancelled() {
            return Ok(FutureOutcome::Abandoned);
        }
        let output = self
            .presenter
            .publish(target, page, false)
            .await
            .map_err(|e| WatchError::SessionIo(e.to_string()))?;
        Ok(FutureOutcome::Published(output))
    }
}
