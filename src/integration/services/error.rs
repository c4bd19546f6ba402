//! Service-level errors for reconciliation.

use thiserror::Error;

use super::retry::{RetryError, Retryable};
use crate::integration::{
    domain::{ErrorKind, IntegrationDomainError},
    ports::{LedgerError, TaskSourceError, TrackerError, VcsError},
};

/// Errors that end or interrupt a reconciliation step.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// No usable credential for the remote tracker.
    #[error("authentication required: {0}")]
    AuthRequired(String),

    /// A deterministic name collides with a remote object this task does
    /// not own.
    #[error("naming conflict: {0}")]
    NamingConflict(String),

    /// The task cannot be integrated as given.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A retryable failure persisted through every attempt.
    #[error("{operation} failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Name of the retried operation.
        operation: &'static str,
        /// Attempts made, including the first.
        attempts: u32,
        /// Error from the final attempt.
        source: Box<Self>,
    },

    /// Cancellation was observed at a suspension point.
    #[error("reconciliation cancelled")]
    Cancelled,

    /// Tracker operation failed.
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    /// Version control operation failed.
    #[error(transparent)]
    Vcs(#[from] VcsError),

    /// Ledger operation failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Loading the task or report failed.
    #[error(transparent)]
    Source(#[from] TaskSourceError),

    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] IntegrationDomainError),
}

/// Result type for reconciliation services.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

impl ReconcileError {
    /// Classifies the error for the ledger and exit code.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AuthRequired(_) => ErrorKind::AuthRequired,
            Self::NamingConflict(_) => ErrorKind::NamingConflict,
            Self::InvalidInput(_) | Self::Domain(_) => ErrorKind::InvalidInput,
            Self::RetriesExhausted { .. } => ErrorKind::RemoteTransient,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Tracker(err) => err.kind(),
            Self::Vcs(err) => err.kind(),
            Self::Ledger(_) => ErrorKind::Local,
            Self::Source(TaskSourceError::Io(_)) => ErrorKind::Local,
            Self::Source(_) => ErrorKind::InvalidInput,
        }
    }
}

impl Retryable for ReconcileError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Tracker(err) => err.is_retryable(),
            Self::Vcs(err) => err.is_retryable(),
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<std::time::Duration> {
        match self {
            Self::Tracker(err) => err.retry_after(),
            _ => None,
        }
    }
}

impl<E> From<RetryError<E>> for ReconcileError
where
    E: std::error::Error + Into<Self> + 'static,
{
    fn from(err: RetryError<E>) -> Self {
        match err {
            RetryError::Cancelled => Self::Cancelled,
            RetryError::Exhausted {
                operation,
                attempts,
                last,
            } => Self::RetriesExhausted {
                operation,
                attempts,
                source: Box::new(last.into()),
            },
            RetryError::Failed(last) => last.into(),
        }
    }
}
