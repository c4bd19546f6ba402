//! Classification of reconciliation failures.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Failure taxonomy recorded in the ledger and surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No usable credential for the remote tracker.
    AuthRequired,
    /// Timeout, 5xx-class or rate-limit response that outlived its retries.
    RemoteTransient,
    /// The remote answered with an unexpected shape.
    RemoteProtocol,
    /// The task branch diverged and one rebase did not reconcile it.
    PushConflict,
    /// A deterministic name collides with an object this task does not own.
    NamingConflict,
    /// External cancellation was observed at a suspension point.
    Cancelled,
    /// The remote refused the operation for the authenticated identity.
    PermissionDenied,
    /// Task, report or derived names are unusable as given.
    InvalidInput,
    /// Local persistence or process failure.
    Local,
}

impl ErrorKind {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AuthRequired => "auth_required",
            Self::RemoteTransient => "remote_transient",
            Self::RemoteProtocol => "remote_protocol",
            Self::PushConflict => "push_conflict",
            Self::NamingConflict => "naming_conflict",
            Self::Cancelled => "cancelled",
            Self::PermissionDenied => "permission_denied",
            Self::InvalidInput => "invalid_input",
            Self::Local => "local",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
