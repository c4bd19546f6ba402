//! Reconciliation state machine.

use super::IntegrationDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stage reached by a reconciliation run.
///
/// ```text
/// INIT -> AUTH_CHECKED -> ISSUE_RESOLVED -> BRANCH_READY -> PR_RESOLVED -> LEDGER_UPDATED
///                                                                        -> FAILED
/// ```
///
/// Issue-only runs may move to `LEDGER_UPDATED` straight from
/// `ISSUE_RESOLVED` or `BRANCH_READY`. Any non-terminal stage may fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileStage {
    /// Nothing has been checked yet.
    Init,
    /// The capability probe confirmed a usable credential.
    AuthChecked,
    /// The task issue exists and carries the latest report.
    IssueResolved,
    /// The task branch exists remotely with the task's commits.
    BranchReady,
    /// The pull request exists and carries the latest report.
    PrResolved,
    /// The ledger records the task as integrated.
    LedgerUpdated,
    /// A non-retryable error ended the run.
    Failed,
}

impl ReconcileStage {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::AuthChecked => "auth_checked",
            Self::IssueResolved => "issue_resolved",
            Self::BranchReady => "branch_ready",
            Self::PrResolved => "pr_resolved",
            Self::LedgerUpdated => "ledger_updated",
            Self::Failed => "failed",
        }
    }

    /// Returns `true` when no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::LedgerUpdated | Self::Failed)
    }

    /// Returns `true` when moving from `self` to `target` is permitted.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        match (self, target) {
            (Self::Init, Self::AuthChecked)
            | (Self::AuthChecked, Self::IssueResolved)
            | (Self::IssueResolved | Self::BranchReady, Self::LedgerUpdated)
            | (Self::IssueResolved, Self::BranchReady)
            | (Self::BranchReady, Self::PrResolved)
            | (Self::PrResolved, Self::LedgerUpdated) => true,
            (from, Self::Failed) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Moves to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationDomainError::InvalidStageTransition`] when the
    /// state machine forbids the move.
    pub fn advance(&mut self, target: Self) -> Result<(), IntegrationDomainError> {
        if !self.can_transition_to(target) {
            return Err(IntegrationDomainError::InvalidStageTransition {
                from: self.as_str().to_owned(),
                to: target.as_str().to_owned(),
            });
        }
        *self = target;
        Ok(())
    }
}

impl fmt::Display for ReconcileStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
