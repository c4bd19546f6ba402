//! Deterministic discovery and creation of remote issues and pull requests.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::error::{ReconcileError, ReconcileResult};
use super::retry::RetryPolicy;
use crate::integration::{
    domain::{
        AGENT_TASK_LABEL, BranchName, ErrorKind, IssueDraft, IssueRef, IssueState, ProjectBoard,
        PullRequestDraft, PullRequestState, RemoteIssue, RemotePullRequest, Reviewers, TaskKey,
        TitlePrefix,
    },
    ports::IssueTracker,
};

/// Remote object found or created by the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<T> {
    /// The remote object as last observed.
    pub remote: T,
    /// Whether this call created it.
    pub created: bool,
}

/// Finds task issues by exact title prefix and task pull requests by exact
/// source branch, creating them when absent.
///
/// Every create is preceded by a fresh lookup inside the same retried unit,
/// so a create whose response was lost is rediscovered rather than repeated.
#[derive(Debug)]
pub struct RemoteStateResolver<T>
where
    T: IssueTracker,
{
    tracker: Arc<T>,
    retry: RetryPolicy,
}

impl<T> Clone for RemoteStateResolver<T>
where
    T: IssueTracker,
{
    fn clone(&self) -> Self {
        Self {
            tracker: Arc::clone(&self.tracker),
            retry: self.retry,
        }
    }
}

impl<T> RemoteStateResolver<T>
where
    T: IssueTracker,
{
    /// Creates a resolver over `tracker`.
    #[must_use]
    pub const fn new(tracker: Arc<T>, retry: RetryPolicy) -> Self {
        Self { tracker, retry }
    }

    /// Finds the task's issue.
    ///
    /// `known` is the issue recorded in the ledger; it is preferred over
    /// search results and is the only way a closed issue is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::NamingConflict`] when the prefix is carried
    /// by an issue this task does not own, and tracker errors otherwise.
    #[instrument(skip_all, fields(task = %task))]
    pub async fn find_issue(
        &self,
        task: &TaskKey,
        known: Option<&IssueRef>,
        cancel: &CancellationToken,
    ) -> ReconcileResult<Option<RemoteIssue>> {
        Ok(self
            .retry
            .run(cancel, "find issue", move || self.lookup_issue(task, known))
            .await?)
    }

    /// Finds the task's issue, creating it from `draft` when absent, and
    /// brings an existing issue's body up to date.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError`] when lookup, creation or the body update
    /// fails permanently.
    #[instrument(skip_all, fields(task = %task))]
    pub async fn ensure_issue(
        &self,
        task: &TaskKey,
        draft: &IssueDraft,
        known: Option<&IssueRef>,
        cancel: &CancellationToken,
    ) -> ReconcileResult<Resolved<RemoteIssue>> {
        let mut resolved = self
            .retry
            .run(cancel, "resolve issue", move || {
                self.find_or_create_issue(task, draft, known)
            })
            .await?;
        if resolved.created {
            info!(issue = %resolved.remote.number, "created task issue");
            return Ok(resolved);
        }
        if resolved.remote.body != draft.body {
            let number = resolved.remote.number;
            let body = draft.body.as_str();
            let tracker = &*self.tracker;
            self.retry
                .run(cancel, "update issue", move || {
                    tracker.update_issue_body(number, body)
                })
                .await?;
            resolved.remote.body.clone_from(&draft.body);
            debug!(issue = %number, "refreshed task issue body");
        }
        Ok(resolved)
    }

    /// Finds the task's pull request, whose source branch is `branch`.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::NamingConflict`] when a pull request from
    /// the branch is not titled for `task`, when the branch has several open
    /// pull requests, or when it has only closed, unmerged ones.
    #[instrument(skip_all, fields(task = %task, branch = %branch))]
    pub async fn find_pull_request(
        &self,
        task: &TaskKey,
        branch: &BranchName,
        cancel: &CancellationToken,
    ) -> ReconcileResult<Option<RemotePullRequest>> {
        let prefix = TitlePrefix::for_task(task);
        let owner = &prefix;
        Ok(self
            .retry
            .run(cancel, "find pull request", move || {
                self.lookup_pull_request(owner, branch)
            })
            .await?)
    }

    /// Finds the branch's pull request, opening it from `draft` when absent,
    /// refreshes the body of an open one and requests `reviewers`.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError`] when lookup, creation, the body update or
    /// the reviewer request fails permanently.
    #[instrument(skip_all, fields(task = %task, branch = %draft.head))]
    pub async fn ensure_pull_request(
        &self,
        task: &TaskKey,
        draft: &PullRequestDraft,
        reviewers: &Reviewers,
        cancel: &CancellationToken,
    ) -> ReconcileResult<Resolved<RemotePullRequest>> {
        let prefix = TitlePrefix::for_task(task);
        let owner = &prefix;
        let mut resolved = self
            .retry
            .run(cancel, "resolve pull request", move || {
                self.find_or_create_pull_request(owner, draft)
            })
            .await?;
        let number = resolved.remote.number;
        let tracker = &*self.tracker;
        if resolved.created {
            info!(pull_request = %number, "opened task pull request");
        } else if resolved.remote.state == PullRequestState::Open
            && resolved.remote.body != draft.body
        {
            let body = draft.body.as_str();
            self.retry
                .run(cancel, "update pull request", move || {
                    tracker.update_pull_request_body(number, body)
                })
                .await?;
            resolved.remote.body.clone_from(&draft.body);
            debug!(pull_request = %number, "refreshed pull request body");
        }
        if resolved.remote.state == PullRequestState::Open && !reviewers.is_empty() {
            self.retry
                .run(cancel, "request reviewers", move || {
                    tracker.request_reviewers(number, reviewers)
                })
                .await?;
            debug!(
                users = reviewers.users.len(),
                teams = reviewers.teams.len(),
                "requested reviewers"
            );
        }
        Ok(resolved)
    }

    /// Returns the repository's default branch, or `fallback` when the
    /// tracker cannot say.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError`] for failures other than an unexpected
    /// response, which falls back instead.
    pub async fn default_branch(
        &self,
        fallback: &str,
        cancel: &CancellationToken,
    ) -> ReconcileResult<String> {
        let tracker = &*self.tracker;
        let outcome: ReconcileResult<String> = self
            .retry
            .run(cancel, "default branch", move || tracker.default_branch())
            .await
            .map_err(ReconcileError::from);
        match outcome {
            Ok(branch) if !branch.trim().is_empty() => Ok(branch),
            Ok(_) => Ok(fallback.to_owned()),
            Err(err) if err.kind() == ErrorKind::RemoteProtocol => {
                warn!(error = %err, fallback, "default branch unavailable");
                Ok(fallback.to_owned())
            }
            Err(err) => Err(err),
        }
    }

    /// Adds the issue to a project board.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError`] when the board update fails permanently.
    #[instrument(skip_all, fields(project = board.number, issue = %issue.number))]
    pub async fn add_to_project(
        &self,
        board: &ProjectBoard,
        issue: &IssueRef,
        cancel: &CancellationToken,
    ) -> ReconcileResult<()> {
        let tracker = &*self.tracker;
        self.retry
            .run(cancel, "add to project", move || {
                tracker.add_to_project(board, issue)
            })
            .await?;
        Ok(())
    }

    async fn lookup_issue(
        &self,
        task: &TaskKey,
        known: Option<&IssueRef>,
    ) -> ReconcileResult<Option<RemoteIssue>> {
        let prefix = TitlePrefix::for_task(task);
        let matches: Vec<RemoteIssue> = self
            .tracker
            .search_issues(&prefix)
            .await?
            .into_iter()
            .filter(|issue| prefix.matches(&issue.title))
            .collect();
        if let Some(reference) = known {
            if let Some(issue) = matches.iter().find(|issue| issue.number == reference.number) {
                return Ok(Some(issue.clone()));
            }
            if let Some(issue) = self.tracker.get_issue(reference.number).await?
                && prefix.matches(&issue.title)
            {
                return Ok(Some(issue));
            }
            warn!(issue = %reference.number, "recorded issue no longer carries the task prefix");
        }
        select_issue(&prefix, matches)
    }

    async fn find_or_create_issue(
        &self,
        task: &TaskKey,
        draft: &IssueDraft,
        known: Option<&IssueRef>,
    ) -> ReconcileResult<Resolved<RemoteIssue>> {
        if let Some(remote) = self.lookup_issue(task, known).await? {
            return Ok(Resolved {
                remote,
                created: false,
            });
        }
        let remote = self.tracker.create_issue(draft).await?;
        Ok(Resolved {
            remote,
            created: true,
        })
    }

    async fn lookup_pull_request(
        &self,
        prefix: &TitlePrefix,
        branch: &BranchName,
    ) -> ReconcileResult<Option<RemotePullRequest>> {
        let pulls: Vec<RemotePullRequest> = self
            .tracker
            .find_pull_requests(branch)
            .await?
            .into_iter()
            .filter(|pull| pull.is_from(branch))
            .collect();
        select_pull_request(prefix, branch, &pulls)
    }

    async fn find_or_create_pull_request(
        &self,
        prefix: &TitlePrefix,
        draft: &PullRequestDraft,
    ) -> ReconcileResult<Resolved<RemotePullRequest>> {
        if let Some(remote) = self.lookup_pull_request(prefix, &draft.head).await? {
            return Ok(Resolved {
                remote,
                created: false,
            });
        }
        let remote = self.tracker.create_pull_request(draft).await?;
        Ok(Resolved {
            remote,
            created: true,
        })
    }
}

/// Picks the task's issue among exact-prefix matches.
///
/// A single open, agent-labelled issue is the task's issue. Several open
/// matches, an unlabelled match or a closed match are conflicts that need a
/// human decision.
fn select_issue(
    prefix: &TitlePrefix,
    matches: Vec<RemoteIssue>,
) -> ReconcileResult<Option<RemoteIssue>> {
    let (open, closed): (Vec<RemoteIssue>, Vec<RemoteIssue>) = matches
        .into_iter()
        .partition(|issue| issue.state == IssueState::Open);
    match open.as_slice() {
        [] => {}
        [issue] if issue.is_agent_owned() => return Ok(Some(issue.clone())),
        [issue] => {
            return Err(ReconcileError::NamingConflict(format!(
                "issue #{} is titled {prefix} but lacks the {AGENT_TASK_LABEL} label",
                issue.number
            )));
        }
        several => {
            return Err(ReconcileError::NamingConflict(format!(
                "{} open issues are titled {prefix}: {}",
                several.len(),
                numbers(several.iter().map(|issue| issue.number.value()))
            )));
        }
    }
    closed.first().map_or(Ok(None), |issue| {
        Err(ReconcileError::NamingConflict(format!(
            "closed issue #{} is titled {prefix}; reopen or retitle it",
            issue.number
        )))
    })
}

/// Picks the branch's pull request: the open one, else the latest merged
/// one. A pull request not titled for the task, several open pull requests,
/// or only closed unmerged ones, conflict.
fn select_pull_request(
    prefix: &TitlePrefix,
    branch: &BranchName,
    pulls: &[RemotePullRequest],
) -> ReconcileResult<Option<RemotePullRequest>> {
    if let Some(foreign) = pulls.iter().find(|pull| !prefix.matches(&pull.title)) {
        return Err(ReconcileError::NamingConflict(format!(
            "pull request #{} from {branch} is titled {:?}, not {prefix}",
            foreign.number, foreign.title
        )));
    }
    let open: Vec<&RemotePullRequest> = pulls
        .iter()
        .filter(|pull| pull.state == PullRequestState::Open)
        .collect();
    match open.as_slice() {
        [] => {}
        [pull] => return Ok(Some((*pull).clone())),
        several => {
            return Err(ReconcileError::NamingConflict(format!(
                "{} open pull requests come from {branch}: {}",
                several.len(),
                numbers(several.iter().map(|pull| pull.number.value()))
            )));
        }
    }
    if let Some(merged) = pulls
        .iter()
        .filter(|pull| pull.state == PullRequestState::Merged)
        .max_by_key(|pull| pull.number.value())
    {
        return Ok(Some(merged.clone()));
    }
    pulls.first().map_or(Ok(None), |pull| {
        Err(ReconcileError::NamingConflict(format!(
            "pull request #{} from {branch} was closed without merging",
            pull.number
        )))
    })
}

fn numbers(values: impl Iterator<Item = u64>) -> String {
    values
        .map(|value| format!("#{value}"))
        .collect::<Vec<_>>()
        .join(", ")
}
