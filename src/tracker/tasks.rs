use std::time::Duration;

use tracing::debug;

use super::TrackerError;

/// Stable handle for a task. Display names can be edited freely, the id never changes,
/// so renames keep accumulated time and active status attached to the right task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u32);

#[derive(Debug)]
struct TaskEntry {
    id: TaskId,
    name: String,
    accumulated: Duration,
}

/// Current reading for one task, produced by [TaskLedger::snapshot].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskTime {
    pub name: String,
    pub total: Duration,
    pub active: bool,
}

#[derive(Debug, Clone, Copy)]
struct ActiveTask {
    id: TaskId,
    /// Stopwatch reading when accrual last (re)started. None while the stopwatch is
    /// stopped, in which case the task is selected but accrues nothing.
    accruing_since: Option<Duration>,
}

/// Tracks the set of named tasks and the time each has accrued. At most one task is
/// active at an instant; only the active one accrues, and only while the stopwatch
/// runs. The `now` arguments are stopwatch readings, not wall-clock time, so the ledger
/// and the elapsed counter can never drift apart.
///
/// Time spent with no task selected counts toward the session total but toward no task,
/// which is why the task durations don't have to sum up to the grand total.
#[derive(Debug, Default)]
pub struct TaskLedger {
    tasks: Vec<TaskEntry>,
    next_id: u32,
    active: Option<ActiveTask>,
}

impl TaskLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_task(&mut self, name: &str) -> Result<TaskId, TrackerError> {
        if self.position_of(name).is_some() {
            return Err(TrackerError::DuplicateTask(name.to_string()));
        }
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.tasks.push(TaskEntry {
            id,
            name: name.to_string(),
            accumulated: Duration::ZERO,
        });
        Ok(id)
    }

    /// Makes `name` the active task. The previously active task gets its in-flight time
    /// folded in first, so switching never loses anything. The new task only starts
    /// accruing if the stopwatch is running.
    pub fn select_task(
        &mut self,
        name: &str,
        now: Duration,
        running: bool,
    ) -> Result<TaskId, TrackerError> {
        let index = self
            .position_of(name)
            .ok_or_else(|| TrackerError::UnknownTask(name.to_string()))?;
        self.settle_active(now);
        let id = self.tasks[index].id;
        debug!("Task {name} became active at {now:?}");
        self.active = Some(ActiveTask {
            id,
            accruing_since: running.then_some(now),
        });
        Ok(id)
    }

    pub fn rename_task(&mut self, old_name: &str, new_name: &str) -> Result<(), TrackerError> {
        let index = self
            .position_of(old_name)
            .ok_or_else(|| TrackerError::UnknownTask(old_name.to_string()))?;
        if old_name != new_name && self.position_of(new_name).is_some() {
            return Err(TrackerError::DuplicateTask(new_name.to_string()));
        }
        self.tasks[index].name = new_name.to_string();
        Ok(())
    }

    /// The canonical current duration of a task: its stored time plus, if it is the one
    /// accruing right now, the stopwatch time since it became active. Recomputed on
    /// every call.
    pub fn duration_of(&self, name: &str, now: Duration) -> Result<Duration, TrackerError> {
        let index = self
            .position_of(name)
            .ok_or_else(|| TrackerError::UnknownTask(name.to_string()))?;
        let entry = &self.tasks[index];
        Ok(entry.accumulated + self.in_flight(entry.id, now))
    }

    /// Current readings for every task in insertion order.
    pub fn snapshot(&self, now: Duration) -> Vec<TaskTime> {
        self.tasks
            .iter()
            .map(|entry| TaskTime {
                name: entry.name.clone(),
                total: entry.accumulated + self.in_flight(entry.id, now),
                active: self.active.is_some_and(|active| active.id == entry.id),
            })
            .collect()
    }

    pub fn active_task_name(&self) -> Option<&str> {
        let active = self.active?;
        self.tasks
            .iter()
            .find(|entry| entry.id == active.id)
            .map(|entry| entry.name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// The stopwatch resumed. Restart the active task's accrual from here.
    pub(crate) fn on_start(&mut self, now: Duration) {
        if let Some(active) = self.active.as_mut() {
            active.accruing_since = Some(now);
        }
    }

    /// The stopwatch froze at `now`. Fold in-flight time in and pause accrual.
    pub(crate) fn on_stop(&mut self, now: Duration) {
        self.settle_active(now);
        if let Some(active) = self.active.as_mut() {
            active.accruing_since = None;
        }
    }

    fn settle_active(&mut self, now: Duration) {
        let Some(active) = self.active else {
            return;
        };
        let Some(since) = active.accruing_since else {
            return;
        };
        let entry = self
            .tasks
            .iter_mut()
            .find(|entry| entry.id == active.id)
            .expect("active task must stay in the ledger");
        entry.accumulated += now.saturating_sub(since);
        self.active = Some(ActiveTask {
            id: active.id,
            accruing_since: Some(now),
        });
    }

    fn position_of(&self, name: &str) -> Option<usize> {
        self.tasks.iter().position(|entry| entry.name == name)
    }

    fn in_flight(&self, id: TaskId, now: Duration) -> Duration {
        match self.active {
            Some(active) if active.id == id => match active.accruing_since {
                Some(since) => now.saturating_sub(since),
                None => Duration::ZERO,
            },
            _ => Duration::ZERO,
        }
    }
}
