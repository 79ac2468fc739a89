// Error taxonomy for synchronous rejections and backend failures

use thiserror::Error;

/// Errors surfaced synchronously by start/cancel calls, plus the uniform
/// per-invocation backend failure.
///
/// Asynchronous per-backend failures never propagate as errors from a
/// dispatch call; they become `error`-status records on the event stream.
#[derive(Debug, Error)]
pub enum ArenaError {
    /// Malformed request: empty selection, empty question/topic, bad round count
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Debate start with more participants than the configured maximum
    #[error("too many participants: {selected} selected, maximum is {max}")]
    TooManyParticipants { selected: usize, max: usize },

    /// A run is already active for this session id
    #[error("session '{0}' already has an active run")]
    SessionBusy(String),

    /// Opaque backend failure; all non-success outcomes look alike
    #[error("backend error: {0}")]
    Backend(String),
}

impl ArenaError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        ArenaError::InvalidRequest(msg.into())
    }

    pub fn backend(msg: impl std::fmt::Display) -> Self {
        ArenaError::Backend(msg.to_string())
    }
}
