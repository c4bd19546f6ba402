//! Domain model for task integration.
//!
//! The integration domain models task and report records, the remote objects
//! derived from them, deterministic branch naming, and the ledger entry that
//! checkpoints reconciliation progress. Infrastructure concerns stay outside
//! of the domain boundary.

mod auth;
mod board;
mod branch;
mod codeowners;
mod commit;
mod error;
mod ids;
mod issue;
mod kind;
mod ledger;
mod pull_request;
mod report;
mod stage;
mod task;

pub use auth::{AuthMethod, AuthPolicy, AuthState};
pub use board::ProjectBoard;
pub use branch::{BranchName, BranchRef};
pub use codeowners::{CodeOwners, Reviewers};
pub use commit::CommitMessage;
pub use error::{IntegrationDomainError, ParseChangeTypeError};
pub use ids::{IssueNumber, PullRequestNumber, RepositoryFullName, TaskKey};
pub use issue::{
    AGENT_TASK_LABEL, AUTOMATION_LABEL, IssueDraft, IssueRef, IssueState, RemoteIssue, TitlePrefix,
};
pub use kind::ErrorKind;
pub use ledger::{LedgerEntry, LedgerStatus, RecordedError};
pub use pull_request::{PullRequestDraft, PullRequestRef, PullRequestState, RemotePullRequest};
pub use report::{ArtifactChange, CriterionResult, Report, Verification};
pub use stage::ReconcileStage;
pub use task::{ChangeType, TaskSpec};
