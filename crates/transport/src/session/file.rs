//! [`FileSessionStore`]: durable session slot on local disk.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::store::{SessionStore, SessionStoreError};

/// On-disk record. The token is the only field persisted.
#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    token: String,
}

/// Session store persisted to a single JSON file.
///
/// The file is replaced atomically (write to a sibling temp file, then
/// rename), so a crash mid-write leaves either the old or the new session.
/// Reads are served from an in-memory copy loaded by [`FileSessionStore::open`].
/// Writers are serialised so the file and the in-memory copy always agree on
/// the last writer.
#[derive(Clone)]
pub struct FileSessionStore {
    path: Arc<PathBuf>,
    cached: Arc<ArcSwapOption<String>>,
    write_lock: Arc<Mutex<()>>,
}

impl fmt::Debug for FileSessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSessionStore")
            .field("path", &self.path)
            .field("has_token", &self.cached.load().is_some())
            .finish()
    }
}

impl FileSessionStore {
    /// Open the store at `path`, loading any session left by a previous run.
    ///
    /// A missing file means no session. An unreadable record is discarded
    /// with a warning rather than failing startup.
    ///
    /// # Errors
    ///
    /// Returns [`SessionStoreError::Io`] if the file exists but cannot be read.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, SessionStoreError> {
        let path = path.into();
        let token = match tokio::fs::read(&path).await {
            Ok(raw) => match serde_json::from_slice::<StoredSession>(&raw) {
                Ok(record) if !record.token.is_empty() => Some(Arc::new(record.token)),
                Ok(_) => None,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "discarding unreadable session file");
                    None
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), restored = token.is_some(), "session store opened");
        Ok(Self {
            path: Arc::new(path),
            cached: Arc::new(ArcSwapOption::new(token)),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, token: &str) -> Result<(), SessionStoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec(&StoredSession {
            token: token.to_owned(),
        })?;

        let tmp = self.path.with_extension("tmp");
        // A temp file left by a crash keeps its old mode across truncate.
        match tokio::fs::remove_file(&tmp).await {
            Ok(()) => debug!(path = %tmp.display(), "removed stale session temp file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        let mut opts = tokio::fs::OpenOptions::new();
        opts.write(true).create(true).truncate(true);
        #[cfg(unix)]
        opts.mode(0o600);

        let mut file = opts.open(&tmp).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, self.path.as_ref()).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn get_token(&self) -> Result<Option<String>, SessionStoreError> {
        Ok(self.cached.load_full().map(|t| t.as_ref().clone()))
    }

    async fn set_token(&self, token: &str) -> Result<(), SessionStoreError> {
        let _guard = self.write_lock.lock().await;
        self.persist(token).await?;
        self.cached.store(Some(Arc::new(token.to_owned())));
        Ok(())
    }

    async fn clear_token(&self) -> Result<(), SessionStoreError> {
        let _guard = self.write_lock.lock().await;
        // Drop the in-process session first so no later call can use it, even
        // if the file removal below fails.
        self.cached.store(None);
        match tokio::fs::remove_file(self.path.as_ref()).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
