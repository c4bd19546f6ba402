//! YAML ledger document with file locking and atomic replacement.

use std::collections::BTreeMap;
use std::fs::File;

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::fs::{open_lock_file, read_optional, write_atomic};
use crate::integration::{
    domain::{LedgerEntry, TaskKey},
    ports::{LedgerError, LedgerResult, LedgerStore, TaskLease},
};

/// Document format version written by this store.
pub const LEDGER_VERSION: u32 = 3;

/// Directory, beside the ledger, holding per-task lock files.
const TASK_LOCK_DIR: &str = "locks";

#[derive(Debug, Serialize, Deserialize)]
struct LedgerDocument {
    version: u32,
    #[serde(default)]
    tasks: BTreeMap<TaskKey, LedgerEntry>,
}

impl Default for LedgerDocument {
    fn default() -> Self {
        Self {
            version: LEDGER_VERSION,
            tasks: BTreeMap::new(),
        }
    }
}

/// Ledger stored as one YAML document.
///
/// Every write takes an exclusive lock on `<ledger>.lock`, re-reads the
/// document, merges the entry and atomically replaces the file. Per-task
/// mutual exclusion uses a separate lock file per task under `locks/`, so
/// runs for different tasks only contend for the short document write.
#[derive(Debug, Clone)]
pub struct YamlLedger {
    path: Utf8PathBuf,
}

/// Held lock file; the lock is released on drop.
#[derive(Debug)]
struct LockedFile(File);

impl Drop for LockedFile {
    fn drop(&mut self) {
        if let Err(err) = FileExt::unlock(&self.0) {
            warn!(error = %err, "failed to release ledger lock");
        }
    }
}

impl YamlLedger {
    /// Creates a store for the document at `path`.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the document path.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Returns every path this store creates beside the document: the
    /// document itself, its lock, the task lock directory and a glob over
    /// the temporary files of atomic writes.
    ///
    /// Version control must never stage these.
    #[must_use]
    pub fn working_paths(&self) -> Vec<Utf8PathBuf> {
        vec![
            self.path.clone(),
            self.document_lock_path(),
            self.task_lock_dir(),
            Utf8PathBuf::from(format!("{}.*.tmp", self.path)),
        ]
    }

    fn document_lock_path(&self) -> Utf8PathBuf {
        Utf8PathBuf::from(format!("{}.lock", self.path))
    }

    fn task_lock_dir(&self) -> Utf8PathBuf {
        self.path
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."))
            .join(TASK_LOCK_DIR)
    }

    fn task_lock_path(&self, task: &TaskKey) -> Utf8PathBuf {
        self.task_lock_dir().join(format!("{task}.lock"))
    }

    fn load(&self) -> LedgerResult<LedgerDocument> {
        let Some(contents) = read_optional(&self.path).map_err(LedgerError::persistence)? else {
            return Ok(LedgerDocument::default());
        };
        if contents.trim().is_empty() {
            return Ok(LedgerDocument::default());
        }
        let document: LedgerDocument =
            serde_yaml::from_str(&contents).map_err(|err| self.corrupt(err.to_string()))?;
        if document.version > LEDGER_VERSION {
            return Err(self.corrupt(format!(
                "unsupported version {} (newest known is {LEDGER_VERSION})",
                document.version
            )));
        }
        if let Some((key, entry)) = document
            .tasks
            .iter()
            .find(|(key, entry)| entry.task() != *key)
        {
            return Err(self.corrupt(format!(
                "entry keyed {key} describes task {}",
                entry.task()
            )));
        }
        Ok(document)
    }

    fn corrupt(&self, message: String) -> LedgerError {
        LedgerError::Corrupt {
            path: self.path.to_string(),
            message,
        }
    }

    fn lock_document(&self) -> LedgerResult<LockedFile> {
        let file = open_lock_file(&self.document_lock_path()).map_err(LedgerError::persistence)?;
        FileExt::lock_exclusive(&file).map_err(LedgerError::persistence)?;
        Ok(LockedFile(file))
    }

    fn put_blocking(&self, entry: LedgerEntry) -> LedgerResult<LedgerEntry> {
        let _lock = self.lock_document()?;
        let mut document = self.load()?;
        let previous = document.tasks.get(entry.task());
        if entry.would_downgrade(previous) {
            warn!(task = %entry.task(), "keeping integrated ledger entry over pending write");
        }
        let merged = entry.supersede(previous);
        merged.validate()?;
        document.version = LEDGER_VERSION;
        document
            .tasks
            .insert(merged.task().clone(), merged.clone());
        let rendered = serde_yaml::to_string(&document).map_err(|err| self.corrupt(err.to_string()))?;
        write_atomic(&self.path, rendered.as_bytes()).map_err(LedgerError::persistence)?;
        debug!(task = %merged.task(), status = %merged.status(), "ledger entry written");
        Ok(merged)
    }
}

/// Runs blocking file work off the async runtime.
async fn blocking<T, F>(work: F) -> LedgerResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> LedgerResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| LedgerError::persistence(std::io::Error::other(err.to_string())))?
}

#[async_trait]
impl LedgerStore for YamlLedger {
    async fn lock(&self, task: &TaskKey) -> LedgerResult<TaskLease> {
        let path = self.task_lock_path(task);
        let guard = blocking(move || {
            let file = open_lock_file(&path).map_err(LedgerError::persistence)?;
            FileExt::lock_exclusive(&file).map_err(LedgerError::persistence)?;
            Ok(LockedFile(file))
        })
        .await?;
        Ok(TaskLease::new(task.clone(), guard))
    }

    async fn get(&self, task: &TaskKey) -> LedgerResult<Option<LedgerEntry>> {
        let store = self.clone();
        let key = task.clone();
        blocking(move || {
            let _lock = store.lock_document()?;
            Ok(store.load()?.tasks.remove(&key))
        })
        .await
    }

    async fn put(&self, entry: LedgerEntry) -> LedgerResult<LedgerEntry> {
        let store = self.clone();
        blocking(move || store.put_blocking(entry)).await
    }

    async fn list(&self) -> LedgerResult<Vec<LedgerEntry>> {
        let store = self.clone();
        blocking(move || {
            let _lock = store.lock_document()?;
            Ok(store.load()?.tasks.into_values().collect())
        })
        .await
    }
}
