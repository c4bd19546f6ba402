//! Task branch materialization: checkout, commit and push.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::error::ReconcileResult;
use super::retry::{RetryError, RetryPolicy};
use crate::integration::{
    domain::{BranchName, BranchRef, CommitMessage, IssueNumber, Report, TaskSpec},
    ports::{BranchStart, VcsError, VersionControl},
};

/// Ensures the task branch exists locally and remotely and carries the
/// task's changes exactly once.
///
/// Re-running with the same inputs reuses the branch and, because the
/// working tree is already committed, adds no second commit.
#[derive(Debug)]
pub struct BranchMaterializer<V>
where
    V: VersionControl,
{
    vcs: Arc<V>,
    retry: RetryPolicy,
}

impl<V> Clone for BranchMaterializer<V>
where
    V: VersionControl,
{
    fn clone(&self) -> Self {
        Self {
            vcs: Arc::clone(&self.vcs),
            retry: self.retry,
        }
    }
}

impl<V> BranchMaterializer<V>
where
    V: VersionControl,
{
    /// Creates a materializer over `vcs`.
    #[must_use]
    pub const fn new(vcs: Arc<V>, retry: RetryPolicy) -> Self {
        Self { vcs, retry }
    }

    /// Materializes the task branch.
    ///
    /// The report's modified paths are staged (everything when it lists
    /// none) and committed with a conventional-commit message that closes
    /// `issue`. A push rejected because the remote diverged is retried once
    /// after rebasing onto the remote branch.
    ///
    /// # Errors
    ///
    /// Returns [`super::ReconcileError::Domain`] when no valid branch name
    /// can be derived, a [`VcsError::PushRejected`] or
    /// [`VcsError::RebaseConflict`] when the one rebase does not reconcile
    /// the branch, and other version control failures as they occur.
    #[instrument(skip_all, fields(task = %task.key()))]
    pub async fn ensure_branch(
        &self,
        task: &TaskSpec,
        report: Option<&Report>,
        issue: Option<IssueNumber>,
        cancel: &CancellationToken,
    ) -> ReconcileResult<BranchRef> {
        let name = BranchName::for_task(task.key(), task.title())?;
        let created = self.checkout(&name, cancel).await?;

        let paths = report.map(Report::changed_paths).unwrap_or_default();
        self.vcs.stage(&paths).await?;
        let committed = if self.vcs.has_staged_changes().await? {
            let message = CommitMessage::for_task(task, report, issue);
            let commit = self.vcs.commit(&message).await?;
            info!(%commit, header = message.header(), "committed task changes");
            true
        } else {
            debug!("no uncommitted changes; reusing existing commits");
            false
        };

        self.push(&name, cancel).await?;
        let head = self.vcs.head_commit().await?;
        Ok(BranchRef::new(name, head, created, committed))
    }

    /// Counts commits on the checked-out branch that `base` lacks.
    ///
    /// # Errors
    ///
    /// Returns the version control failure, wrapped when retries ran out.
    pub async fn commits_ahead(&self, base: &str, cancel: &CancellationToken) -> ReconcileResult<u64> {
        let vcs = &*self.vcs;
        let ahead = self
            .retry
            .run(cancel, "count commits ahead", move || vcs.commits_ahead(base))
            .await?;
        Ok(ahead)
    }

    /// Checks out `name`, returning `true` when it had to be created.
    async fn checkout(&self, name: &BranchName, cancel: &CancellationToken) -> ReconcileResult<bool> {
        let vcs = &*self.vcs;
        let start = if vcs.local_branch_exists(name).await? {
            BranchStart::Existing
        } else if self
            .retry
            .run(cancel, "probe remote branch", move || {
                vcs.remote_branch_exists(name)
            })
            .await?
        {
            BranchStart::TrackRemote
        } else {
            BranchStart::NewFromHead
        };
        if start == BranchStart::TrackRemote {
            self.retry
                .run(cancel, "fetch remote branch", move || vcs.checkout(name, start))
                .await?;
        } else {
            vcs.checkout(name, start).await?;
        }
        debug!(branch = %name, ?start, "task branch checked out");
        Ok(start == BranchStart::NewFromHead)
    }

    /// Pushes with backoff, rebasing once if the remote diverged.
    async fn push(&self, name: &BranchName, cancel: &CancellationToken) -> ReconcileResult<()> {
        let vcs = &*self.vcs;
        let first = self
            .retry
            .run(cancel, "push branch", move || vcs.push(name))
            .await;
        match first {
            Ok(()) => return Ok(()),
            Err(RetryError::Failed(VcsError::PushRejected(_))) => {
                warn!(branch = %name, "remote branch diverged; rebasing once");
            }
            Err(err) => return Err(err.into()),
        }
        self.retry
            .run(cancel, "rebase branch", move || vcs.rebase_onto_remote(name))
            .await?;
        self.retry
            .run(cancel, "push rebased branch", move || vcs.push(name))
            .await?;
        Ok(())
    }
}
