pub mod engine;
pub mod session;
pub mod splits;
pub mod tasks;

use thiserror::Error;

/// Recoverable failures reported by the tracking core. The host surface is expected to
/// show the message and keep going; a failing operation never leaves state half-updated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrackerError {
    #[error("no session has been started yet")]
    NoSession,
    #[error("session `{0}` still has unsaved data, end or discard it first")]
    UnfinishedSession(String),
    #[error("session title is empty")]
    EmptySessionTitle,
    #[error("task `{0}` already exists")]
    DuplicateTask(String),
    #[error("unknown task `{0}`")]
    UnknownTask(String),
    #[error("no split with number {0}")]
    SplitOutOfRange(usize),
}
