//! Optional project board target.

use serde::{Deserialize, Serialize};

/// Project board that receives task issues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectBoard {
    /// Project number within its owner.
    pub number: u64,
    /// Owning user or organisation; the repository owner when absent.
    pub owner: Option<String>,
    /// Status option to set on the added item.
    pub status: Option<String>,
}

impl ProjectBoard {
    /// Creates a board target without a status.
    #[must_use]
    pub const fn new(number: u64) -> Self {
        Self {
            number,
            owner: None,
            status: None,
        }
    }

    /// Sets the owning user or organisation.
    #[must_use]
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Sets the status option applied after adding an issue.
    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }
}
