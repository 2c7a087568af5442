use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Local};
use futures::TryStreamExt;

use crate::{
    storage::session_store::{SessionStore, SessionStoreImpl},
    utils::time::{format_clock, format_compact},
};

use super::session_dir;

/// Command to list saved sessions. Enumeration order from the store is unspecified, so
/// keys are sorted before printing.
pub async fn list_sessions(dir: Option<PathBuf>) -> Result<()> {
    let store = SessionStoreImpl::new(session_dir(dir)?)?;

    let mut keys = store.list().try_collect::<Vec<_>>().await?;
    keys.sort();

    if keys.is_empty() {
        println!("No saved sessions yet");
        return Ok(());
    }

    for key in keys {
        // An unreadable record only costs its own row, the rest of the listing goes on.
        match store.load(&key).await {
            Ok(session) => {
                let saved = store
                    .saved_at(&key)
                    .await
                    .map(|v| DateTime::<Local>::from(v).format("%x %H:%M").to_string())
                    .unwrap_or_else(|_| "-".to_string());
                println!(
                    "{key}\t{}\t{saved}\t{}",
                    format_compact(session.total),
                    session.title
                );
            }
            Err(e) => println!("{key}\t(unreadable: {e})"),
        }
    }
    Ok(())
}

/// Command to display one saved session in full, splits included.
pub async fn show_session(key: &str, dir: Option<PathBuf>) -> Result<()> {
    let store = SessionStoreImpl::new(session_dir(dir)?)?;
    let session = store.load(key).await?;

    println!("{}", session.title);
    if !session.description.is_empty() {
        println!("{}", session.description);
    }
    println!("Total\t{}", format_clock(session.total));

    if session.splits.is_empty() {
        println!("No splits recorded");
        return Ok(());
    }
    println!();
    for split in &session.splits {
        println!(
            "{}\t{}\t{}\t{}",
            split.number,
            format_clock(split.delta),
            format_clock(split.total),
            split.description
        );
    }
    Ok(())
}
