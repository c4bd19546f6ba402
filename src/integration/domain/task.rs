//! Task records as dispatched to agents.

use super::{IntegrationDomainError, ParseChangeTypeError, TaskKey};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared kind of change a task produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// New functionality.
    #[serde(alias = "feat")]
    Feature,
    /// Bug fix.
    Fix,
    /// Documentation only.
    Docs,
    /// Behaviour-preserving restructuring.
    Refactor,
    /// Test additions or corrections.
    Test,
    /// Maintenance work.
    Chore,
}

impl ChangeType {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Feature => "feature",
            Self::Fix => "fix",
            Self::Docs => "docs",
            Self::Refactor => "refactor",
            Self::Test => "test",
            Self::Chore => "chore",
        }
    }

    /// Returns the conventional-commit type keyword.
    #[must_use]
    pub const fn commit_type(self) -> &'static str {
        match self {
            Self::Feature => "feat",
            other => other.as_str(),
        }
    }

    /// Infers a change type from keywords in a task title.
    ///
    /// Used when a task does not declare its type.
    #[must_use]
    pub fn infer_from_title(title: &str) -> Self {
        let lowered = title.to_lowercase();
        if lowered.contains("fix") || lowered.contains("bug") {
            Self::Fix
        } else if lowered.contains("test") {
            Self::Test
        } else if lowered.contains("doc") {
            Self::Docs
        } else if lowered.contains("refactor") {
            Self::Refactor
        } else {
            Self::Feature
        }
    }
}

impl TryFrom<&str> for ChangeType {
    type Error = ParseChangeTypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "feature" | "feat" => Ok(Self::Feature),
            "fix" => Ok(Self::Fix),
            "docs" => Ok(Self::Docs),
            "refactor" => Ok(Self::Refactor),
            "test" => Ok(Self::Test),
            "chore" => Ok(Self::Chore),
            _ => Err(ParseChangeTypeError(value.to_owned())),
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable task definition consumed by reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    key: TaskKey,
    title: String,
    goal: String,
    context: String,
    acceptance_criteria: Vec<String>,
    change_type: Option<ChangeType>,
}

impl TaskSpec {
    /// Creates a task with the required identifier and title.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationDomainError::EmptyTitle`] if the title is empty
    /// after trimming.
    pub fn new(key: TaskKey, title: impl Into<String>) -> Result<Self, IntegrationDomainError> {
        let raw_title = title.into();
        let normalized_title = raw_title.trim();
        if normalized_title.is_empty() {
            return Err(IntegrationDomainError::EmptyTitle);
        }

        Ok(Self {
            key,
            title: normalized_title.to_owned(),
            goal: String::new(),
            context: String::new(),
            acceptance_criteria: Vec::new(),
            change_type: None,
        })
    }

    /// Sets the goal text.
    #[must_use]
    pub fn with_goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = goal.into().trim().to_owned();
        self
    }

    /// Sets the background context.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into().trim().to_owned();
        self
    }

    /// Sets the ordered acceptance criteria, dropping blank entries.
    #[must_use]
    pub fn with_acceptance_criteria(mut self, criteria: impl IntoIterator<Item = String>) -> Self {
        self.acceptance_criteria = criteria
            .into_iter()
            .map(|criterion| criterion.trim().to_owned())
            .filter(|criterion| !criterion.is_empty())
            .collect();
        self
    }

    /// Declares the change type.
    #[must_use]
    pub const fn with_change_type(mut self, change_type: ChangeType) -> Self {
        self.change_type = Some(change_type);
        self
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn key(&self) -> &TaskKey {
        &self.key
    }

    /// Returns the task title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the goal text.
    #[must_use]
    pub fn goal(&self) -> &str {
        &self.goal
    }

    /// Returns the background context.
    #[must_use]
    pub fn context(&self) -> &str {
        &self.context
    }

    /// Returns the ordered acceptance criteria.
    #[must_use]
    pub fn acceptance_criteria(&self) -> &[String] {
        &self.acceptance_criteria
    }

    /// Returns the declared change type, or one inferred from the title.
    #[must_use]
    pub fn change_type(&self) -> ChangeType {
        self.change_type
            .unwrap_or_else(|| ChangeType::infer_from_title(&self.title))
    }
}
