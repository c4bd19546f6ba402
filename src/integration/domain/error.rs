//! Error types for integration domain validation and parsing.

use thiserror::Error;

/// Errors returned while constructing integration domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IntegrationDomainError {
    /// The task identifier is empty or contains characters unusable in
    /// branch names and issue titles.
    #[error("invalid task identifier '{0}', expected [A-Za-z0-9._-], at most 64 characters")]
    InvalidTaskKey(String),

    /// The task title is empty after trimming.
    #[error("task title must not be empty")]
    EmptyTitle,

    /// The repository name does not follow `owner/repo` format.
    #[error("invalid repository name '{0}', expected owner/repo")]
    InvalidRepository(String),

    /// The issue number is invalid.
    #[error("invalid issue number {0}, expected a positive integer")]
    InvalidIssueNumber(u64),

    /// The pull request number is invalid.
    #[error("invalid pull request number {0}, expected a positive integer")]
    InvalidPullRequestNumber(u64),

    /// The branch name is malformed or exceeds its length limit.
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    /// The declared change type is unknown.
    #[error(transparent)]
    InvalidChangeType(#[from] ParseChangeTypeError),

    /// An integrated ledger entry is missing a required remote reference.
    #[error("ledger entry for {task} cannot be integrated without a {missing} reference")]
    IncompleteIntegration {
        /// Task identifier.
        task: String,
        /// Name of the missing reference.
        missing: &'static str,
    },

    /// Transitioning between two reconciliation stages is invalid.
    #[error("invalid reconciliation transition: {from} -> {to}")]
    InvalidStageTransition {
        /// Current stage.
        from: String,
        /// Requested stage.
        to: String,
    },
}

/// Error returned while parsing a declared change type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown change type: {0}")]
pub struct ParseChangeTypeError(pub String);
