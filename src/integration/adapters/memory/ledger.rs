//! In-memory ledger store.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use tracing::warn;

use crate::integration::{
    domain::{LedgerEntry, TaskKey},
    ports::{LedgerError, LedgerResult, LedgerStore, TaskLease},
};

/// Thread-safe in-memory ledger with per-task asynchronous mutexes.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    entries: Arc<RwLock<BTreeMap<TaskKey, LedgerEntry>>>,
    locks: Arc<Mutex<HashMap<TaskKey, Arc<tokio::sync::Mutex<()>>>>>,
    writes: Arc<RwLock<Vec<LedgerEntry>>>,
}

impl InMemoryLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every stored entry in write order, including superseded ones.
    #[must_use]
    pub fn history(&self) -> Vec<LedgerEntry> {
        self.writes
            .read()
            .map(|writes| writes.clone())
            .unwrap_or_default()
    }

    /// Stores an entry without merging, as if written by an earlier run.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] when the state lock is poisoned.
    pub fn seed(&self, entry: LedgerEntry) -> LedgerResult<()> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.insert(entry.task().clone(), entry);
        Ok(())
    }

    fn task_mutex(&self, task: &TaskKey) -> LedgerResult<Arc<tokio::sync::Mutex<()>>> {
        let mut locks = self.locks.lock().map_err(poisoned)?;
        Ok(Arc::clone(locks.entry(task.clone()).or_default()))
    }
}

fn poisoned(err: impl std::fmt::Display) -> LedgerError {
    LedgerError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl LedgerStore for InMemoryLedger {
    async fn lock(&self, task: &TaskKey) -> LedgerResult<TaskLease> {
        let mutex = self.task_mutex(task)?;
        let guard = mutex.lock_owned().await;
        Ok(TaskLease::new(task.clone(), guard))
    }

    async fn get(&self, task: &TaskKey) -> LedgerResult<Option<LedgerEntry>> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.get(task).cloned())
    }

    async fn put(&self, entry: LedgerEntry) -> LedgerResult<LedgerEntry> {
        let stored = {
            let mut entries = self.entries.write().map_err(poisoned)?;
            let previous = entries.get(entry.task());
            if entry.would_downgrade(previous) {
                warn!(task = %entry.task(), "keeping integrated ledger entry over pending write");
            }
            let merged = entry.supersede(previous);
            merged.validate()?;
            entries.insert(merged.task().clone(), merged.clone());
            merged
        };
        let mut writes = self.writes.write().map_err(poisoned)?;
        writes.push(stored.clone());
        Ok(stored)
    }

    async fn list(&self) -> LedgerResult<Vec<LedgerEntry>> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.values().cloned().collect())
    }
}
