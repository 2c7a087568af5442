use std::time::Duration;

use tracing::debug;

use super::{
    session::Session,
    splits::{Split, SplitLog},
    tasks::{TaskId, TaskLedger, TaskTime},
    TrackerError,
};

/// Observable stopwatch states. `Idle` and `Stopped` only differ by whether any time
/// has accumulated yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
    Stopped,
}

struct SessionMeta {
    title: String,
    description: String,
}

/// The stopwatch state machine. Owns the cumulative elapsed counter and the split
/// marker, and drives accrual in the task ledger so that splits and task time are
/// computed off the same readings.
///
/// All mutation happens through `tick` and the explicit operations; `elapsed`,
/// `duration_of` and the other reads are pure, so a render path can call them at any
/// frequency.
///
/// One engine instance serves one session lifecycle at a time: `begin_session` refuses
/// to overwrite unsaved work, and `end_session`/`discard_session` return it to the
/// idle zero state.
#[derive(Default)]
pub struct StopwatchEngine {
    session: Option<SessionMeta>,
    elapsed: Duration,
    last_split: Duration,
    running: bool,
    splits: SplitLog,
    tasks: TaskLedger,
}

impl StopwatchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Establishes the session this engine is timing. Unsaved work from a previous
    /// session has to be ended or discarded explicitly first, nothing is dropped
    /// silently.
    pub fn begin_session(&mut self, title: &str, description: &str) -> Result<(), TrackerError> {
        if title.trim().is_empty() {
            return Err(TrackerError::EmptySessionTitle);
        }
        if let Some(session) = &self.session {
            if self.has_unsaved_data() {
                return Err(TrackerError::UnfinishedSession(session.title.clone()));
            }
        }
        debug!("Starting session {title}");
        self.session = Some(SessionMeta {
            title: title.trim().to_string(),
            description: description.to_string(),
        });
        self.elapsed = Duration::ZERO;
        self.last_split = Duration::ZERO;
        self.running = false;
        self.splits.clear();
        self.tasks = TaskLedger::new();
        Ok(())
    }

    /// Starts (or resumes) the stopwatch. A no-op while already running. The active
    /// task, if any, resumes accruing from this instant.
    pub fn start(&mut self) -> Result<(), TrackerError> {
        if self.session.is_none() {
            return Err(TrackerError::NoSession);
        }
        if self.running {
            return Ok(());
        }
        self.running = true;
        self.tasks.on_start(self.elapsed);
        debug!("Stopwatch started at {:?}", self.elapsed);
        Ok(())
    }

    /// Freezes the elapsed total at its current value and pauses the active task's
    /// accrual, folding its in-flight time in at this exact reading. A no-op while not
    /// running.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.tasks.on_stop(self.elapsed);
        debug!("Stopwatch stopped at {:?}", self.elapsed);
    }

    /// Advances the elapsed counter by one quantum. Ticks arriving while the stopwatch
    /// is not running are ignored; the caller picks the granularity.
    pub fn tick(&mut self, quantum: Duration) {
        if self.running {
            self.elapsed += quantum;
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn state(&self) -> EngineState {
        if self.running {
            EngineState::Running
        } else if self.elapsed.is_zero() {
            EngineState::Idle
        } else {
            EngineState::Stopped
        }
    }

    /// Zeroes the elapsed counter and the split marker. Ignored while running. The
    /// split log and the task ledger are left alone; discarding those is a session
    /// lifecycle decision, not a stopwatch one.
    pub fn reset(&mut self) {
        if self.running {
            return;
        }
        self.elapsed = Duration::ZERO;
        self.last_split = Duration::ZERO;
    }

    /// Records a split at the current elapsed total. The delta is measured against the
    /// previous split, so the first split's delta is the full elapsed time.
    pub fn record_split(&mut self, description: &str) -> &Split {
        let delta = self.elapsed - self.last_split;
        self.last_split = self.elapsed;
        self.splits.append(delta, self.elapsed, description.to_string())
    }

    pub fn edit_split(&mut self, number: usize, description: &str) -> Result<(), TrackerError> {
        self.splits.edit_description(number, description)
    }

    pub fn splits(&self) -> &[Split] {
        self.splits.all()
    }

    pub fn add_task(&mut self, name: &str) -> Result<TaskId, TrackerError> {
        self.tasks.add_task(name)
    }

    pub fn select_task(&mut self, name: &str) -> Result<TaskId, TrackerError> {
        self.tasks.select_task(name, self.elapsed, self.running)
    }

    pub fn rename_task(&mut self, old_name: &str, new_name: &str) -> Result<(), TrackerError> {
        self.tasks.rename_task(old_name, new_name)
    }

    pub fn duration_of(&self, name: &str) -> Result<Duration, TrackerError> {
        self.tasks.duration_of(name, self.elapsed)
    }

    /// Current readings for every task. Read this before `end_session` if you want the
    /// breakdown; it is not part of the persisted session.
    pub fn task_times(&self) -> Vec<TaskTime> {
        self.tasks.snapshot(self.elapsed)
    }

    pub fn active_task(&self) -> Option<&str> {
        self.tasks.active_task_name()
    }

    pub fn session_title(&self) -> Option<&str> {
        self.session.as_ref().map(|v| v.title.as_str())
    }

    /// A frozen view of the session as it stands right now, or None before
    /// `begin_session`. Pure read; lets callers persist first and clear after, so a
    /// failed save leaves everything in place for another attempt.
    pub fn snapshot(&self) -> Option<Session> {
        let meta = self.session.as_ref()?;
        Some(Session {
            title: meta.title.clone(),
            description: meta.description.clone(),
            total: self.elapsed,
            splits: self.splits.all().to_vec(),
        })
    }

    /// Stops the stopwatch, freezes everything into a [Session] snapshot, and resets
    /// the engine to zero for the next session.
    pub fn end_session(&mut self) -> Result<Session, TrackerError> {
        self.stop();
        let session = self.snapshot().ok_or(TrackerError::NoSession)?;
        debug!(
            "Session {} ended at {:?} with {} splits",
            session.title,
            session.total,
            session.splits.len()
        );
        self.session = None;
        self.clear();
        Ok(session)
    }

    /// Drops the current session and all working state without persisting anything.
    pub fn discard_session(&mut self) {
        self.session = None;
        self.clear();
    }

    fn clear(&mut self) {
        self.elapsed = Duration::ZERO;
        self.last_split = Duration::ZERO;
        self.running = false;
        self.splits.clear();
        self.tasks = TaskLedger::new();
    }

    fn has_unsaved_data(&self) -> bool {
        !self.elapsed.is_zero() || !self.splits.is_empty() || !self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::tracker::{
        engine::{EngineState, StopwatchEngine},
        TrackerError,
    };

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn started_engine() -> StopwatchEngine {
        let mut engine = StopwatchEngine::new();
        engine.begin_session("test", "").unwrap();
        engine.start().unwrap();
        engine
    }

    fn tick_times(engine: &mut StopwatchEngine, quantum: Duration, times: usize) {
        for _ in 0..times {
            engine.tick(quantum);
        }
    }

    #[test]
    fn test_start_requires_session() {
        let mut engine = StopwatchEngine::new();
        assert_eq!(engine.start(), Err(TrackerError::NoSession));
        assert_eq!(engine.end_session().unwrap_err(), TrackerError::NoSession);
    }

    #[test]
    fn test_begin_session_rejects_blank_title() {
        let mut engine = StopwatchEngine::new();
        assert_eq!(
            engine.begin_session("   ", "desc"),
            Err(TrackerError::EmptySessionTitle)
        );
    }

    #[test]
    fn test_elapsed_is_sum_of_quanta() {
        let mut engine = started_engine();
        tick_times(&mut engine, ms(1), 150);
        assert_eq!(engine.elapsed(), ms(150));

        // ticks while stopped are ignored
        engine.stop();
        tick_times(&mut engine, ms(1), 30);
        assert_eq!(engine.elapsed(), ms(150));

        engine.start().unwrap();
        tick_times(&mut engine, ms(10), 3);
        assert_eq!(engine.elapsed(), ms(180));
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut engine = started_engine();
        tick_times(&mut engine, ms(1), 10);
        engine.start().unwrap();
        assert_eq!(engine.state(), EngineState::Running);
        assert_eq!(engine.elapsed(), ms(10));
    }

    #[test]
    fn test_state_machine_observations() {
        let mut engine = StopwatchEngine::new();
        engine.begin_session("s", "").unwrap();
        assert_eq!(engine.state(), EngineState::Idle);
        engine.start().unwrap();
        assert_eq!(engine.state(), EngineState::Running);
        engine.tick(ms(5));
        engine.stop();
        assert_eq!(engine.state(), EngineState::Stopped);
        engine.reset();
        assert_eq!(engine.state(), EngineState::Idle);
    }

    #[test]
    fn test_split_scenario() {
        // start -> tick x100 (1ms) -> split("warmup") -> tick x50 -> split("main")
        let mut engine = started_engine();
        tick_times(&mut engine, ms(1), 100);
        engine.record_split("warmup");
        tick_times(&mut engine, ms(1), 50);
        engine.record_split("main");

        let splits = engine.splits();
        assert_eq!(splits.len(), 2);
        assert_eq!(
            (splits[0].number, splits[0].delta, splits[0].total),
            (1, ms(100), ms(100))
        );
        assert_eq!(splits[0].description, "warmup");
        assert_eq!(
            (splits[1].number, splits[1].delta, splits[1].total),
            (2, ms(50), ms(150))
        );
        assert_eq!(splits[1].description, "main");
        assert_eq!(engine.elapsed(), ms(150));

        let delta_sum: Duration = splits.iter().map(|s| s.delta).sum();
        assert_eq!(delta_sum, engine.elapsed());
    }

    #[test]
    fn test_reset_keeps_splits_and_tasks() {
        let mut engine = started_engine();
        engine.add_task("a").unwrap();
        tick_times(&mut engine, ms(1), 20);
        engine.record_split("one");
        engine.stop();

        engine.reset();
        assert_eq!(engine.elapsed(), ms(0));
        assert_eq!(engine.splits().len(), 1);
        assert_eq!(engine.task_times().len(), 1);

        // a split taken after the reset measures from the fresh marker
        engine.start().unwrap();
        tick_times(&mut engine, ms(1), 5);
        engine.record_split("two");
        assert_eq!(engine.splits()[1].delta, ms(5));
    }

    #[test]
    fn test_reset_ignored_while_running() {
        let mut engine = started_engine();
        tick_times(&mut engine, ms(1), 10);
        engine.reset();
        assert_eq!(engine.elapsed(), ms(10));
    }

    #[test]
    fn test_task_accrual_through_engine() {
        let mut engine = started_engine();
        engine.add_task("write").unwrap();
        engine.add_task("review").unwrap();

        // 30ms of idle time before any task is selected
        tick_times(&mut engine, ms(1), 30);
        engine.select_task("write").unwrap();
        tick_times(&mut engine, ms(1), 50);
        engine.select_task("review").unwrap();
        tick_times(&mut engine, ms(1), 20);

        assert_eq!(engine.duration_of("write").unwrap(), ms(50));
        assert_eq!(engine.duration_of("review").unwrap(), ms(20));
        // idle time counts toward the session but toward no task
        assert_eq!(engine.elapsed(), ms(100));

        engine.stop();
        assert_eq!(engine.duration_of("review").unwrap(), ms(20));
    }

    #[test]
    fn test_task_selected_while_stopped_waits_for_start() {
        let mut engine = started_engine();
        tick_times(&mut engine, ms(1), 10);
        engine.stop();

        engine.add_task("later").unwrap();
        engine.select_task("later").unwrap();
        assert_eq!(engine.duration_of("later").unwrap(), ms(0));

        engine.start().unwrap();
        tick_times(&mut engine, ms(1), 25);
        assert_eq!(engine.duration_of("later").unwrap(), ms(25));
    }

    #[test]
    fn test_end_session_freezes_and_resets() {
        let mut engine = started_engine();
        tick_times(&mut engine, ms(1), 40);
        engine.record_split("only");

        let session = engine.end_session().unwrap();
        assert_eq!(session.title, "test");
        assert_eq!(session.total, ms(40));
        assert_eq!(session.splits.len(), 1);

        // engine is back at zero and ready for the next session
        assert_eq!(engine.state(), EngineState::Idle);
        assert_eq!(engine.elapsed(), ms(0));
        assert!(engine.splits().is_empty());
        assert_eq!(engine.session_title(), None);
        engine.begin_session("next", "").unwrap();
    }

    #[test]
    fn test_begin_session_refuses_unsaved_work() {
        let mut engine = started_engine();
        tick_times(&mut engine, ms(1), 5);
        engine.stop();

        assert_eq!(
            engine.begin_session("other", ""),
            Err(TrackerError::UnfinishedSession("test".into()))
        );

        engine.discard_session();
        engine.begin_session("other", "").unwrap();
        assert_eq!(engine.session_title(), Some("other"));
    }

    #[test]
    fn test_end_session_stops_task_accrual_exactly() {
        let mut engine = started_engine();
        engine.add_task("work").unwrap();
        engine.select_task("work").unwrap();
        tick_times(&mut engine, ms(1), 60);

        let task_times = engine.task_times();
        let session = engine.end_session().unwrap();
        assert_eq!(session.total, ms(60));
        assert_eq!(task_times[0].total, ms(60));
        assert!(task_times[0].active);
    }
}
