//! Remote issue value objects and the title-prefix naming convention.

use super::{IssueNumber, TaskKey};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Label marking an issue as owned by the agent integration.
pub const AGENT_TASK_LABEL: &str = "agent-task";

/// Label marking an issue as created by automation.
pub const AUTOMATION_LABEL: &str = "automation";

/// Deterministic issue title prefix `[{task}]`.
///
/// Issues are re-discovered by exact prefix match, never by fuzzy search:
/// `[T001] Add login` matches `T001`, while `[T0011] Other` and
/// `Re: [T001] Add login` do not.
///
/// # Examples
///
///     use taskbridge::integration::domain::{TaskKey, TitlePrefix};
///
///     let prefix = TitlePrefix::for_task(&TaskKey::new("T001").expect("valid"));
///     assert!(prefix.matches("[T001] Add login"));
///     assert!(!prefix.matches("[T0011] Add login"));
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitlePrefix(String);

impl TitlePrefix {
    /// Builds the prefix for a task.
    #[must_use]
    pub fn for_task(task: &TaskKey) -> Self {
        Self(format!("[{task}]"))
    }

    /// Returns `true` when `title` carries exactly this prefix.
    #[must_use]
    pub fn matches(&self, title: &str) -> bool {
        title.strip_prefix(self.0.as_str()).is_some_and(|rest| {
            rest.is_empty() || rest.starts_with(char::is_whitespace)
        })
    }

    /// Formats a full issue or pull request title.
    #[must_use]
    pub fn title(&self, title: &str) -> String {
        format!("{} {}", self.0, title.trim())
    }

    /// Returns the prefix as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TitlePrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Remote issue state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueState {
    /// The issue is open.
    Open,
    /// The issue has been closed.
    Closed,
}

/// Issue number and browser URL, as recorded in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IssueRef {
    /// Remote issue number.
    pub number: IssueNumber,
    /// Browser URL of the issue.
    pub url: String,
}

/// Issue as observed on the remote tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteIssue {
    /// Remote issue number.
    pub number: IssueNumber,
    /// Issue title.
    pub title: String,
    /// Issue body.
    pub body: String,
    /// Label names.
    pub labels: Vec<String>,
    /// Open or closed.
    pub state: IssueState,
    /// Browser URL of the issue.
    pub url: String,
}

impl RemoteIssue {
    /// Returns the ledger reference for this issue.
    #[must_use]
    pub fn to_ref(&self) -> IssueRef {
        IssueRef {
            number: self.number,
            url: self.url.clone(),
        }
    }

    /// Returns `true` when the issue carries the agent ownership label.
    #[must_use]
    pub fn is_agent_owned(&self) -> bool {
        self.labels.iter().any(|label| label == AGENT_TASK_LABEL)
    }
}

/// Payload for creating a new issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueDraft {
    /// Issue title, always starting with the task's [`TitlePrefix`].
    pub title: String,
    /// Issue body.
    pub body: String,
    /// Labels to apply.
    pub labels: Vec<String>,
}

impl IssueDraft {
    /// Creates a draft titled `[{task}] {title}` with the agent labels.
    #[must_use]
    pub fn for_task(task: &TaskKey, title: &str, body: String) -> Self {
        Self {
            title: TitlePrefix::for_task(task).title(title),
            body,
            labels: vec![AGENT_TASK_LABEL.to_owned(), AUTOMATION_LABEL.to_owned()],
        }
    }
}
