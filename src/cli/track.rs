use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use clap::Parser;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, BufReader},
    select,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    storage::session_store::{SessionStore, SessionStoreImpl},
    tracker::engine::{EngineState, StopwatchEngine},
    utils::{
        clock::{Clock, DefaultClock},
        time::format_clock,
    },
};

use super::session_dir;

#[derive(Debug, Parser)]
pub struct TrackCommand {
    #[arg(help = "Title of the session, also the source of its storage key")]
    title: String,
    #[arg(
        short,
        long,
        default_value = "",
        help = "Free-text description saved with the session"
    )]
    description: String,
    #[arg(
        long,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(
        long = "tick-ms",
        default_value_t = 10,
        help = "Tick quantum of the stopwatch in milliseconds"
    )]
    tick_ms: u64,
}

/// Command to track a session interactively: commands are read from stdin one per
/// line while a periodic tick advances the stopwatch.
pub async fn process_track_command(command: TrackCommand) -> Result<()> {
    let store = SessionStoreImpl::new(session_dir(command.dir.clone())?)?;

    let mut engine = StopwatchEngine::new();
    engine.begin_session(&command.title, &command.description)?;

    let shutdown = CancellationToken::new();
    tokio::spawn(detect_shutdown(shutdown.clone()));

    println!(
        "Tracking session {:?}. Type `start` to run the stopwatch, `help` for all commands.",
        command.title
    );

    TrackLoop {
        engine,
        store,
        quantum: Duration::from_millis(command.tick_ms.max(1)),
        clock: Box::new(DefaultClock),
        shutdown,
    }
    .run(BufReader::new(tokio::io::stdin()))
    .await
}

/// Detects signals sent to the process so an accidental Ctrl-C doesn't take unsaved
/// time with it without a word.
async fn detect_shutdown(cancellation: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        cancellation.cancel();
    }
}

enum LoopControl {
    Continue,
    Finished,
}

/// The interactive tracking loop. A single `select!` serializes ticks, user commands,
/// and shutdown, so all engine mutation happens on one logical thread and overlapping
/// ticks can't occur.
struct TrackLoop<S: SessionStore> {
    engine: StopwatchEngine,
    store: S,
    quantum: Duration,
    clock: Box<dyn Clock>,
    shutdown: CancellationToken,
}

impl<S: SessionStore> TrackLoop<S> {
    async fn run(mut self, input: impl AsyncBufRead + Unpin) -> Result<()> {
        let mut lines = input.lines();
        let mut tick_point = self.clock.instant() + self.quantum;
        loop {
            select! {
                _ = self.shutdown.cancelled() => {
                    self.engine.stop();
                    println!();
                    println!(
                        "Interrupted at {}, nothing was saved",
                        format_clock(self.engine.elapsed())
                    );
                    return Ok(());
                }
                line = lines.next_line() => {
                    match line? {
                        Some(line) => {
                            if let LoopControl::Finished = self.handle_command(line.trim()).await? {
                                return Ok(());
                            }
                        }
                        // stdin closed counts as an interrupt, not as an end
                        None => {
                            self.engine.stop();
                            println!("Input closed, nothing was saved");
                            return Ok(());
                        }
                    }
                }
                _ = self.clock.sleep_until(tick_point) => {
                    self.engine.tick(self.quantum);
                    tick_point += self.quantum;
                }
            }
        }
    }

    async fn handle_command(&mut self, line: &str) -> Result<LoopControl> {
        let (command, rest) = split_command(line);
        debug!("Handling command {command:?}");
        match command {
            "" => {}
            "start" => match self.engine.start() {
                Ok(()) => println!("Running"),
                Err(e) => println!("error: {e}"),
            },
            "stop" => {
                self.engine.stop();
                println!("Stopped at {}", format_clock(self.engine.elapsed()));
            }
            "split" => {
                let split = self.engine.record_split(rest);
                println!(
                    "Split {}\t{}\t(total {})",
                    split.number,
                    format_clock(split.delta),
                    format_clock(split.total)
                );
            }
            "splits" => self.print_splits(),
            "edit" => {
                let (number, description) = split_command(rest);
                match number.parse::<usize>() {
                    Ok(number) => match self.engine.edit_split(number, description) {
                        Ok(()) => println!("Split {number} updated"),
                        Err(e) => println!("error: {e}"),
                    },
                    Err(_) => println!("usage: edit <number> <description>"),
                }
            }
            "task" => self.handle_task_command(rest),
            "tasks" => self.print_tasks(),
            "status" => self.print_status(),
            "end" => return self.finish().await,
            "discard" => {
                self.engine.discard_session();
                println!("Discarded, nothing was saved");
                return Ok(LoopControl::Finished);
            }
            "help" => print_help(),
            unknown => println!("Unknown command {unknown:?}, type `help` for the list"),
        }
        Ok(LoopControl::Continue)
    }

    /// Persist-then-clear. If the save fails the engine keeps the whole session, so
    /// `end` can simply be retried.
    async fn finish(&mut self) -> Result<LoopControl> {
        self.engine.stop();
        let Some(session) = self.engine.snapshot() else {
            println!("error: no session has been started yet");
            return Ok(LoopControl::Continue);
        };
        let key = match self.store.save(&session).await {
            Ok(key) => key,
            Err(e) => {
                println!("error: {e}; the session is still in memory, try `end` again");
                return Ok(LoopControl::Continue);
            }
        };

        self.print_tasks();
        println!(
            "Saved {} as {key} ({} splits, total {})",
            session.title,
            session.splits.len(),
            format_clock(session.total)
        );
        self.engine.end_session()?;
        Ok(LoopControl::Finished)
    }

    fn handle_task_command(&mut self, rest: &str) {
        let (sub, name) = split_command(rest);
        match sub {
            "add" if !name.is_empty() => match self.engine.add_task(name) {
                Ok(_) => println!("Added task {name:?}"),
                Err(e) => println!("error: {e}"),
            },
            "select" if !name.is_empty() => match self.engine.select_task(name) {
                Ok(_) => println!("Task {name:?} is now active"),
                Err(e) => println!("error: {e}"),
            },
            "rename" => {
                let names = name.split_whitespace().collect::<Vec<_>>();
                match names.as_slice() {
                    [old, new] => match self.engine.rename_task(old, new) {
                        Ok(()) => println!("Renamed {old:?} to {new:?}"),
                        Err(e) => println!("error: {e}"),
                    },
                    _ => println!("usage: task rename <old> <new>"),
                }
            }
            _ => println!("usage: task add <name> | task select <name> | task rename <old> <new>"),
        }
    }

    fn print_status(&self) {
        let state = match self.engine.state() {
            EngineState::Idle => "idle",
            EngineState::Running => "running",
            EngineState::Stopped => "stopped",
        };
        println!(
            "{state}\t{}\tsplits: {}",
            format_clock(self.engine.elapsed()),
            self.engine.splits().len()
        );
        if let Some(active) = self.engine.active_task() {
            let duration = self.engine.duration_of(active).unwrap_or_default();
            println!("active task\t{active}\t{}", format_clock(duration));
        }
    }

    fn print_splits(&self) {
        let splits = self.engine.splits();
        if splits.is_empty() {
            println!("No splits yet");
            return;
        }
        for split in splits {
            println!(
                "{}\t{}\t{}\t{}",
                split.number,
                format_clock(split.delta),
                format_clock(split.total),
                split.description
            );
        }
    }

    fn print_tasks(&self) {
        let tasks = self.engine.task_times();
        if tasks.is_empty() {
            return;
        }
        for task in tasks {
            println!(
                "{}\t{}\t{}",
                if task.active { "*" } else { " " },
                format_clock(task.total),
                task.name
            );
        }
    }
}

fn split_command(line: &str) -> (&str, &str) {
    match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    }
}

fn print_help() {
    println!(
        "start               run the stopwatch\n\
         stop                pause the stopwatch\n\
         split [text]        record a split at the current total\n\
         splits              list the splits taken so far\n\
         edit <n> <text>     replace the description of split n\n\
         task add <name>     add a task\n\
         task select <name>  make a task active so it accrues time\n\
         task rename <o> <n> rename a task, keeping its time\n\
         tasks               list tasks with their current durations\n\
         status              show state, elapsed total and active task\n\
         end                 save the session and exit\n\
         discard             drop the session without saving and exit"
    );
}
