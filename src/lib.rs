//! contest-watch: a chat bot listing upcoming Codeforces contests.
//!
//! # Architecture
//!
//! - **Cache**: [`contests::ContestCache`] keeps the latest upcoming-contest
//!   snapshot; [`contests::RefreshScheduler`] refreshes it on an interval
//! - **Pages**: [`pages::PageBuilder`] turns a snapshot into display pages
//! - **Sessions**: [`session::SessionRegistry`] owns interactive paginated
//!   listings and expires them after inactivity
//! - **Transport**: [`discord`] renders pages and receives commands

pub mod codeforces;
pub mod commands;
pub mod config;
pub mod contests;
pub mod discord;
pub mod error;
pub mod logging;
pub mod pages;
pub mod present;
pub mod session;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::WatchConfig;
pub use error::{Result, WatchError};
pub use present::{OutputId, PresentError, Presenter};
