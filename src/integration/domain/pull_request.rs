//! Remote pull request value objects.

use super::{BranchName, PullRequestNumber};
use serde::{Deserialize, Serialize};

/// Remote pull request state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullRequestState {
    /// The pull request is open.
    Open,
    /// The pull request has been merged.
    Merged,
    /// The pull request was closed without merging.
    Closed,
}

/// Pull request number and browser URL, as recorded in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PullRequestRef {
    /// Remote pull request number.
    pub number: PullRequestNumber,
    /// Browser URL of the pull request.
    pub url: String,
}

/// Pull request as observed on the remote tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePullRequest {
    /// Remote pull request number.
    pub number: PullRequestNumber,
    /// Pull request title.
    pub title: String,
    /// Source branch.
    pub head: String,
    /// Target branch.
    pub base: String,
    /// Pull request body.
    pub body: String,
    /// Open, merged or closed.
    pub state: PullRequestState,
    /// Browser URL of the pull request.
    pub url: String,
}

impl RemotePullRequest {
    /// Returns the ledger reference for this pull request.
    #[must_use]
    pub fn to_ref(&self) -> PullRequestRef {
        PullRequestRef {
            number: self.number,
            url: self.url.clone(),
        }
    }

    /// Returns `true` when the source branch is exactly `branch`.
    #[must_use]
    pub fn is_from(&self, branch: &BranchName) -> bool {
        self.head == branch.as_str()
    }
}

/// Payload for opening a new pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestDraft {
    /// Pull request title.
    pub title: String,
    /// Pull request body.
    pub body: String,
    /// Source branch.
    pub head: BranchName,
    /// Target branch.
    pub base: String,
}
