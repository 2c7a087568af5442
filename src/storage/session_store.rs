use std::{
    ffi::OsStr,
    future::Future,
    io::ErrorKind,
    ops::Deref,
    path::PathBuf,
    time::SystemTime,
};

use fs4::tokio::AsyncFileExt;
use futures::{future, stream, Stream, StreamExt};
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncWriteExt, BufReader},
};
use tokio_stream::wrappers::ReadDirStream;
use tracing::{debug, warn};

use crate::{tracker::session::Session, utils::time::title_to_key};

use super::{record::SessionRecord, StoreError};

const RECORD_EXTENSION: &str = "csv";

/// Interface for abstracting persistence of completed sessions. One record per
/// session, keyed by the sanitized title; saving the same key again overwrites the
/// previous record.
pub trait SessionStore {
    /// Persists a session and returns the key it was stored under.
    fn save(&self, session: &Session) -> impl Future<Output = Result<String, StoreError>> + Send;

    /// Loads a previously saved session. Task-level detail is not part of the record
    /// and is not restored.
    fn load(&self, key: &str) -> impl Future<Output = Result<Session, StoreError>> + Send;

    /// Lazy, restartable stream of the known session keys. Order is whatever the
    /// directory enumeration yields; sort if you need determinism.
    fn list(&self) -> impl Stream<Item = Result<String, StoreError>> + Send;
}

impl<T: Deref> SessionStore for T
where
    T::Target: SessionStore,
{
    fn save(&self, session: &Session) -> impl Future<Output = Result<String, StoreError>> + Send {
        self.deref().save(session)
    }

    fn load(&self, key: &str) -> impl Future<Output = Result<Session, StoreError>> + Send {
        self.deref().load(key)
    }

    fn list(&self) -> impl Stream<Item = Result<String, StoreError>> + Send {
        self.deref().list()
    }
}

/// The main realization of [SessionStore], keeping one file per session in a flat
/// directory.
pub struct SessionStoreImpl {
    session_dir: PathBuf,
}

impl SessionStoreImpl {
    pub fn new(session_dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&session_dir)?;

        Ok(Self { session_dir })
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.session_dir.join(format!("{key}.{RECORD_EXTENSION}"))
    }

    /// Modification time of a session's record, for saved-at columns in listings.
    pub async fn saved_at(&self, key: &str) -> Result<SystemTime, StoreError> {
        let metadata = match tokio::fs::metadata(self.record_path(key)).await {
            Ok(v) => v,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::SessionNotFound(key.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(metadata.modified()?)
    }
}

impl SessionStore for SessionStoreImpl {
    async fn save(&self, session: &Session) -> Result<String, StoreError> {
        if session.title.trim().is_empty() {
            return Err(StoreError::EmptySessionTitle);
        }
        let key = title_to_key(&session.title);
        let path = self.record_path(&key);
        debug!("Saving session {:?} to {path:?}", session.title);

        let record = SessionRecord::from(session);
        let mut file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .await?;

        // Semi-safe acquire-release for the record file
        file.lock_exclusive()?;
        let result = write_record(&mut file, &record).await;
        file.unlock_async().await?;
        result?;

        Ok(key)
    }

    async fn load(&self, key: &str) -> Result<Session, StoreError> {
        let path = self.record_path(key);
        debug!("Loading session record {path:?}");

        let file = match File::open(&path).await {
            Ok(v) => v,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::SessionNotFound(key.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        file.lock_shared()?;
        let mut reader = BufReader::new(file);
        let mut text = String::new();
        let result = reader.read_to_string(&mut text).await;
        reader.into_inner().unlock_async().await?;
        result?;

        let record = SessionRecord::parse(&text).map_err(|e| {
            warn!("Session record {path:?} can't be parsed: {e:#}");
            StoreError::MalformedRecord {
                key: key.to_string(),
                reason: format!("{e:#}"),
            }
        })?;
        Ok(record.into_session())
    }

    fn list(&self) -> impl Stream<Item = Result<String, StoreError>> + Send {
        let dir = self.session_dir.clone();
        stream::once(async move { tokio::fs::read_dir(dir).await }).flat_map(|read_dir| {
            match read_dir {
                Ok(read_dir) => ReadDirStream::new(read_dir)
                    .filter_map(|entry| {
                        future::ready(match entry {
                            Ok(entry) => record_key(&entry.file_name()).map(Ok),
                            Err(e) => Some(Err(StoreError::from(e))),
                        })
                    })
                    .boxed(),
                Err(e) => stream::once(future::ready(Err(StoreError::from(e)))).boxed(),
            }
        })
    }
}

async fn write_record(file: &mut File, record: &SessionRecord) -> Result<(), StoreError> {
    file.write_all(record.encode().as_bytes()).await?;
    file.flush().await?;
    Ok(())
}

/// Extracts the session key from a directory entry name. Files without the record
/// extension don't belong to the store and are skipped.
fn record_key(file_name: &OsStr) -> Option<String> {
    let name = file_name.to_str()?;
    match name.strip_suffix(&format!(".{RECORD_EXTENSION}")) {
        Some(key) if !key.is_empty() => Some(key.to_string()),
        _ => {
            debug!("Skipping foreign file {name:?} in the session directory");
            None
        }
    }
}
