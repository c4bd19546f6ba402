//! Remote tracker port for issues, pull requests and project boards.

use crate::integration::domain::{
    BranchName, ErrorKind, IssueDraft, IssueNumber, IssueRef, ProjectBoard, PullRequestDraft,
    PullRequestNumber, RemoteIssue, RemotePullRequest, Reviewers, TitlePrefix,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Result type for tracker operations.
pub type TrackerResult<T> = Result<T, TrackerError>;

/// Remote issue tracker contract.
///
/// Implementations perform exactly one remote request per call; retries and
/// backoff are applied by the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Returns issues whose title may start with `prefix`.
    ///
    /// The search is allowed to over-match; callers filter by exact prefix.
    async fn search_issues(&self, prefix: &TitlePrefix) -> TrackerResult<Vec<RemoteIssue>>;

    /// Fetches one issue by number.
    ///
    /// Returns `None` when the issue does not exist.
    async fn get_issue(&self, number: IssueNumber) -> TrackerResult<Option<RemoteIssue>>;

    /// Creates an issue.
    async fn create_issue(&self, draft: &IssueDraft) -> TrackerResult<RemoteIssue>;

    /// Replaces an issue body.
    async fn update_issue_body(&self, number: IssueNumber, body: &str) -> TrackerResult<()>;

    /// Lists pull requests in any state whose source branch is `head`.
    async fn find_pull_requests(&self, head: &BranchName)
    -> TrackerResult<Vec<RemotePullRequest>>;

    /// Opens a pull request.
    async fn create_pull_request(
        &self,
        draft: &PullRequestDraft,
    ) -> TrackerResult<RemotePullRequest>;

    /// Replaces a pull request body.
    async fn update_pull_request_body(
        &self,
        number: PullRequestNumber,
        body: &str,
    ) -> TrackerResult<()>;

    /// Requests reviews from users and teams. Re-requesting is harmless.
    async fn request_reviewers(
        &self,
        number: PullRequestNumber,
        reviewers: &Reviewers,
    ) -> TrackerResult<()>;

    /// Returns the repository's default branch.
    async fn default_branch(&self) -> TrackerResult<String>;

    /// Adds an issue to a project board, setting its status when configured.
    async fn add_to_project(&self, board: &ProjectBoard, issue: &IssueRef) -> TrackerResult<()>;
}

/// Errors returned by tracker implementations.
#[derive(Debug, Clone, Error)]
pub enum TrackerError {
    /// Timeout or 5xx-class failure.
    #[error("transient tracker failure: {0}")]
    Transient(String),

    /// The tracker throttled the request.
    #[error("tracker rate limit reached")]
    RateLimited {
        /// Server-advised delay before the next attempt.
        retry_after: Option<Duration>,
    },

    /// The tracker answered with an unexpected shape.
    #[error("unexpected tracker response: {0}")]
    Protocol(String),

    /// The request was refused for the authenticated identity.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// No valid credential accompanied the request.
    #[error("authentication required: {0}")]
    Unauthenticated(String),

    /// The addressed object does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The tracker rejected the payload.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The tracker client itself could not run.
    #[error("tracker client failure: {0}")]
    Client(Arc<dyn std::error::Error + Send + Sync>),
}

impl TrackerError {
    /// Wraps a client-side failure.
    pub fn client(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Client(Arc::new(err))
    }

    /// Returns `true` for failures worth retrying with backoff.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::RateLimited { .. })
    }

    /// Returns the server-advised delay before retrying, if any.
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Classifies the error for the ledger.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Transient(_) | Self::RateLimited { .. } => ErrorKind::RemoteTransient,
            Self::Protocol(_) | Self::NotFound(_) | Self::Rejected(_) => ErrorKind::RemoteProtocol,
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::Unauthenticated(_) => ErrorKind::AuthRequired,
            Self::Client(_) => ErrorKind::Local,
        }
    }
}
