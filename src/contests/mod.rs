//! Cached view of upcoming contests.
//!
//! [`ContestCache`] holds the latest [`Snapshot`] of future contests and is
//! kept fresh by [`RefreshScheduler`]. Readers never block and never observe
//! a partially built snapshot.

pub mod cache;
pub mod model;
pub mod refresh;

pub use cache::ContestCache;
pub use model::{Contest, Snapshot};
pub use refresh::RefreshScheduler;
