//! Interactive paginated sessions.
//!
//! [`PaginationSession`] is the per-output state machine; [`SessionRegistry`]
//! owns every live session on a single dispatcher task and routes inbound
//! navigation events and expiry wake-ups to them.

pub mod pagination;
pub mod registry;
pub mod timer;

pub use pagination::PaginationSession;
pub use registry::{RegistryHandle, SessionRegistry, SessionStatus};
pub use timer::ExpiryTimer;

/// Lifecycle of a paginated session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Closed,
}

/// Navigation request from the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavEvent {
    First,
    Previous,
    Next,
    Last,
    /// Zero-based page index; out-of-range values clamp to the last page.
    Jump(usize),
    Close,
}

impl NavEvent {
    /// Parse a control id such as `next` or `jump:3` (one-based page number).
    pub fn from_control_id(raw: &str) -> Option<Self> {
        match raw {
            "first" => Some(Self::First),
            "prev" | "previous" => Some(Self::Previous),
            "next" => Some(Self::Next),
            "last" => Some(Self::Last),
            "close" => Some(Self::Close),
            other => {
                let page: usize = other.strip_prefix("jump:")?.parse().ok()?;
                Some(Self::Jump(page.saturating_sub(1)))
            }
        }
    }

    /// Inverse of [`NavEvent::from_control_id`].
    pub fn control_id(&self) -> String {
        match self {
            Self::First => "first".to_owned(),
            Self::Previous => "prev".to_owned(),
            Self::Next => "next".to_owned(),
            Self::Last => "last".to_owned(),
            Self::Jump(index) => format!("jump:{}", index + 1),
            Self::Close => "close".to_owned(),
        }
    }
}
