//! Error types for the contest watcher.

/// Top-level error type for the contest watcher.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Upstream contest list could not be fetched, timed out, or was malformed.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// Requested contest id is not in the current snapshot.
    #[error("contest {0} not in contest list")]
    ContestNotFound(i64),

    /// UTC offset string is not of the form `±HH:MM`.
    #[error("invalid timezone format: {0:?}")]
    InvalidTimezoneFormat(String),

    /// Rendering a session's output failed irrecoverably.
    #[error("session I/O error: {0}")]
    SessionIo(String),

    /// A paginated session was requested with no pages.
    #[error("cannot paginate an empty page list")]
    NoPages,

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel send/receive error.
    #[error("channel error: {0}")]
    Channel(String),

    /// Discord transport error.
    #[error("discord error: {0}")]
    Discord(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, WatchError>;
