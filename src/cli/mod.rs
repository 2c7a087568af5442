pub mod sessions;
pub mod track;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use sessions::{list_sessions, show_session};
use track::{process_track_command, TrackCommand};
use tracing::level_filters::LevelFilter;

use crate::utils::{
    dir::create_application_default_path,
    logging::{enable_logging, CLI_PREFIX},
};

#[derive(Parser, Debug)]
#[command(name = "Lapwatch", version, long_about = None)]
#[command(about = "Terminal stopwatch with splits and per-task time tracking", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Track a work session interactively")]
    Track {
        #[command(flatten)]
        command: TrackCommand,
    },
    #[command(about = "List saved sessions")]
    Sessions {
        #[arg(
            long,
            help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
        )]
        dir: Option<PathBuf>,
    },
    #[command(about = "Display a saved session with its splits")]
    Show {
        #[arg(help = "Session key as printed by `sessions`, for example Morning_Run")]
        key: String,
        #[arg(
            long,
            help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
        )]
        dir: Option<PathBuf>,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(
        CLI_PREFIX,
        &create_application_default_path()?,
        logging_level,
        args.log,
    )?;

    match args.commands {
        Commands::Track { command } => process_track_command(command).await,
        Commands::Sessions { dir } => list_sessions(dir).await,
        Commands::Show { key, dir } => show_session(&key, dir).await,
    }
}

/// Resolves the directory session records live in.
pub fn session_dir(dir: Option<PathBuf>) -> Result<PathBuf> {
    let base = dir.map_or_else(create_application_default_path, Ok)?;
    Ok(base.join("sessions"))
}
