//! Durable ledger port and per-task mutual exclusion.

use crate::integration::domain::{IntegrationDomainError, LedgerEntry, TaskKey};
use async_trait::async_trait;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Durable task-to-remote-object ledger.
///
/// Writes are atomic and monotonic: [`LedgerStore::put`] merges the entry
/// with the stored one via [`LedgerEntry::supersede`] under the store's own
/// lock, so concurrent writers for different tasks never lose each other's
/// entries and an `integrated` entry is never downgraded to `pending`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Acquires the per-task mutex, waiting until it is free.
    ///
    /// The mutex is released when the returned lease is dropped.
    async fn lock(&self, task: &TaskKey) -> LedgerResult<TaskLease>;

    /// Reads the entry for a task.
    async fn get(&self, task: &TaskKey) -> LedgerResult<Option<LedgerEntry>>;

    /// Writes an entry and returns the entry as stored after merging.
    async fn put(&self, entry: LedgerEntry) -> LedgerResult<LedgerEntry>;

    /// Returns every entry ordered by task identifier.
    async fn list(&self) -> LedgerResult<Vec<LedgerEntry>>;
}

/// Exclusive hold on one task's integration.
pub struct TaskLease {
    task: TaskKey,
    _guard: Box<dyn Any + Send + Sync>,
}

impl TaskLease {
    /// Wraps a store-specific guard that releases the mutex on drop.
    pub fn new(task: TaskKey, guard: impl Any + Send + Sync) -> Self {
        Self {
            task,
            _guard: Box::new(guard),
        }
    }

    /// Returns the task the lease covers.
    #[must_use]
    pub const fn task(&self) -> &TaskKey {
        &self.task
    }
}

impl fmt::Debug for TaskLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskLease").field("task", &self.task).finish_non_exhaustive()
    }
}

/// Errors returned by ledger implementations.
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    /// The ledger document could not be parsed.
    #[error("ledger document {path} is corrupt: {message}")]
    Corrupt {
        /// Document path.
        path: String,
        /// Parser diagnostic.
        message: String,
    },

    /// The entry violates a ledger invariant.
    #[error(transparent)]
    Invariant(#[from] IntegrationDomainError),

    /// Reading, writing or locking the ledger failed.
    #[error("ledger persistence failure: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl LedgerError {
    /// Wraps a persistence failure.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
