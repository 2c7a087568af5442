use std::time::Duration;

use super::splits::Split;

/// A finished work period, frozen for persistence or display. Produced by
/// [StopwatchEngine::end_session](super::engine::StopwatchEngine::end_session) and by
/// loading a stored record.
///
/// Per-task time is deliberately absent: the stored record only carries the split log,
/// so a loaded session could never have it. Callers that want the task breakdown read
/// it off the engine before ending the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub title: String,
    pub description: String,
    pub total: Duration,
    pub splits: Vec<Split>,
}
