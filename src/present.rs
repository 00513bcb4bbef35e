//! Presentation layer contract.
//!
//! Sessions and command handlers never talk to a chat service directly; they
//! hand rendered [`Page`]s to a [`Presenter`] and get back an [`OutputId`]
//! naming the message that now shows it.

use crate::pages::Page;
use async_trait::async_trait;
use std::fmt;

/// A rendered output: one message in one channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputId {
    pub channel_id: String,
    pub message_id: String,
}

impl OutputId {
    pub fn new(channel_id: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            message_id: message_id.into(),
        }
    }
}

impl fmt::Display for OutputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.channel_id, self.message_id)
    }
}

/// Failure reported by a presenter.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PresentError {
    /// The output was deleted or is otherwise unreachable for good.
    #[error("output no longer exists")]
    Gone,
    /// Network or API failure.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Accepts rendered pages and turns them into visible output.
#[async_trait]
pub trait Presenter: Send + Sync {
    /// Show `page` as a new output in `target`, with or without navigation controls.
    async fn publish(&self, target: &str, page: &Page, controls: bool)
    -> Result<OutputId, PresentError>;

    /// Replace the content of an existing output.
    async fn update(&self, output: &OutputId, page: &Page) -> Result<(), PresentError>;

    /// Remove navigation controls, leaving the content visible.
    async fn freeze(&self, output: &OutputId) -> Result<(), PresentError>;

    /// Send a short plain notice (rejections, status) to `target`.
    async fn notify(&self, target: &str, text: &str) -> Result<(), PresentError>;
}
