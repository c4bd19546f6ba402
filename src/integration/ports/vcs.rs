//! Local version control port.

use crate::integration::domain::{BranchName, CommitMessage, ErrorKind};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for version control operations.
pub type VcsResult<T> = Result<T, VcsError>;

/// Where a checked-out branch starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchStart {
    /// The branch exists locally.
    Existing,
    /// Create a local branch tracking the remote branch of the same name.
    TrackRemote,
    /// Create the branch from the current `HEAD`.
    NewFromHead,
}

/// Local checkout contract.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Returns `true` when the branch exists locally.
    async fn local_branch_exists(&self, branch: &BranchName) -> VcsResult<bool>;

    /// Returns `true` when the branch exists on the remote.
    async fn remote_branch_exists(&self, branch: &BranchName) -> VcsResult<bool>;

    /// Checks out `branch`, creating it according to `start`.
    async fn checkout(&self, branch: &BranchName, start: BranchStart) -> VcsResult<()>;

    /// Stages `paths`, or every change when `paths` is empty.
    ///
    /// Listed paths with nothing left to stage, such as a deletion already
    /// committed by an earlier run, are ignored.
    async fn stage(&self, paths: &[String]) -> VcsResult<()>;

    /// Returns `true` when the index differs from `HEAD`.
    async fn has_staged_changes(&self) -> VcsResult<bool>;

    /// Commits the index and returns the new commit id.
    async fn commit(&self, message: &CommitMessage) -> VcsResult<String>;

    /// Returns the commit id of `HEAD`.
    async fn head_commit(&self) -> VcsResult<String>;

    /// Counts commits on `HEAD` that are not on `base`.
    async fn commits_ahead(&self, base: &str) -> VcsResult<u64>;

    /// Pushes `branch` to the remote and sets its upstream.
    ///
    /// Never forces. A diverged remote yields [`VcsError::PushRejected`].
    async fn push(&self, branch: &BranchName) -> VcsResult<()>;

    /// Rebases the local branch onto its remote counterpart.
    ///
    /// A conflicting rebase is aborted and yields
    /// [`VcsError::RebaseConflict`].
    async fn rebase_onto_remote(&self, branch: &BranchName) -> VcsResult<()>;
}

/// Errors returned by version control implementations.
#[derive(Debug, Clone, Error)]
pub enum VcsError {
    /// The remote refused a non-fast-forward push.
    #[error("push of {0} was rejected by the remote")]
    PushRejected(String),

    /// Rebasing onto the remote branch conflicted and was aborted.
    #[error("rebase of {0} onto its remote conflicted")]
    RebaseConflict(String),

    /// A network operation failed in a way worth retrying.
    #[error("transient remote failure: {0}")]
    Transient(String),

    /// A version control command exited unsuccessfully.
    #[error("`{command}` failed: {stderr}")]
    Command {
        /// Command line that failed.
        command: String,
        /// Captured standard error.
        stderr: String,
    },

    /// The version control tool could not be run.
    #[error("version control failure: {0}")]
    Io(Arc<dyn std::error::Error + Send + Sync>),
}

impl VcsError {
    /// Wraps an I/O failure.
    pub fn io(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Io(Arc::new(err))
    }

    /// Returns `true` for failures worth retrying with backoff.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Classifies the error for the ledger.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::PushRejected(_) | Self::RebaseConflict(_) => ErrorKind::PushConflict,
            Self::Transient(_) => ErrorKind::RemoteTransient,
            Self::Command { .. } | Self::Io(_) => ErrorKind::Local,
        }
    }
}
