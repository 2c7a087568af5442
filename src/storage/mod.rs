pub mod record;
pub mod session_store;

use thiserror::Error;

/// Failures from the session store. All of these are local and recoverable; callers
/// report the message and carry on. A record that can't be parsed is reported as
/// unreadable for its specific key, never as a crash.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session title is empty")]
    EmptySessionTitle,
    #[error("session `{0}` was not found")]
    SessionNotFound(String),
    #[error("session record `{key}` is unreadable: {reason}")]
    MalformedRecord { key: String, reason: String },
    #[error("session storage i/o failed")]
    Io(#[from] std::io::Error),
}
