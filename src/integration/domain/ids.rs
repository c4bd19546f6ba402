//! Identifier and validated scalar types for the integration domain.

use super::IntegrationDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum accepted length of a task identifier.
const MAX_TASK_KEY_LENGTH: usize = 64;

/// Stable, human-assigned task identifier such as `T001`.
///
/// The identifier is the idempotency key for every remote object created on
/// behalf of the task, so it is restricted to characters that survive
/// verbatim in issue titles and branch names, and letters are stored in
/// upper case. Two keys that differ only in case are the same task. Hyphens
/// are rejected because the branch name uses the first hyphen to separate
/// the identifier from the title slug.
///
/// # Examples
///
///     use taskbridge::integration::domain::TaskKey;
///
///     let key = TaskKey::new("t001").expect("valid key");
///     assert_eq!(key.as_str(), "T001");
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskKey(String);

impl TaskKey {
    /// Creates a validated task identifier.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationDomainError::InvalidTaskKey`] when the value is
    /// empty, too long, does not start with an ASCII letter or digit, or
    /// contains characters outside `[A-Za-z0-9_]`.
    pub fn new(value: impl Into<String>) -> Result<Self, IntegrationDomainError> {
        let raw = value.into();
        let trimmed = raw.trim();
        let is_valid = trimmed.len() <= MAX_TASK_KEY_LENGTH
            && trimmed.starts_with(|ch: char| ch.is_ascii_alphanumeric())
            && trimmed
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '_');

        if !is_valid {
            return Err(IntegrationDomainError::InvalidTaskKey(raw));
        }

        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TaskKey {
    type Error = IntegrationDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TaskKey> for String {
    fn from(value: TaskKey) -> Self {
        value.0
    }
}

impl AsRef<str> for TaskKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Positive issue number from the remote tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct IssueNumber(u64);

impl IssueNumber {
    /// Creates a validated issue number.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationDomainError::InvalidIssueNumber`] when the value
    /// is zero.
    pub const fn new(value: u64) -> Result<Self, IntegrationDomainError> {
        if value == 0 {
            return Err(IntegrationDomainError::InvalidIssueNumber(value));
        }
        Ok(Self(value))
    }

    /// Returns the underlying numeric value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for IssueNumber {
    type Error = IntegrationDomainError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<IssueNumber> for u64 {
    fn from(value: IssueNumber) -> Self {
        value.0
    }
}

impl fmt::Display for IssueNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Positive pull request number from the remote tracker.
///
/// Validated identically to [`IssueNumber`]. The two share a numbering
/// space on most trackers but are kept distinct so they cannot be confused
/// in ledger entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct PullRequestNumber(u64);

impl PullRequestNumber {
    /// Creates a validated pull request number.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationDomainError::InvalidPullRequestNumber`] when the
    /// value is zero.
    pub const fn new(value: u64) -> Result<Self, IntegrationDomainError> {
        if value == 0 {
            return Err(IntegrationDomainError::InvalidPullRequestNumber(value));
        }
        Ok(Self(value))
    }

    /// Returns the underlying numeric value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for PullRequestNumber {
    type Error = IntegrationDomainError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PullRequestNumber> for u64 {
    fn from(value: PullRequestNumber) -> Self {
        value.0
    }
}

impl fmt::Display for PullRequestNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Normalized remote repository identifier in `owner/repo` format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepositoryFullName(String);

impl RepositoryFullName {
    /// Creates a validated repository name.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationDomainError::InvalidRepository`] if the value does
    /// not contain exactly one slash-delimited owner and repository segment.
    pub fn new(value: impl Into<String>) -> Result<Self, IntegrationDomainError> {
        let raw = value.into();
        let normalized = raw.trim();
        let mut segments = normalized.split('/');
        let owner = segments.next().unwrap_or_default();
        let repo = segments.next().unwrap_or_default();
        let has_more_segments = segments.next().is_some();
        let is_valid = !owner.is_empty()
            && !repo.is_empty()
            && !has_more_segments
            && !normalized.chars().any(char::is_whitespace);

        if !is_valid {
            return Err(IntegrationDomainError::InvalidRepository(raw));
        }

        Ok(Self(normalized.to_owned()))
    }

    /// Derives the repository name from a GitHub remote URL.
    ///
    /// Accepts `git@github.com:owner/repo.git`,
    /// `ssh://git@github.com/owner/repo.git` and
    /// `https://github.com/owner/repo(.git)`.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationDomainError::InvalidRepository`] when the URL
    /// does not point at a GitHub repository.
    pub fn from_remote_url(url: &str) -> Result<Self, IntegrationDomainError> {
        let trimmed = url.trim();
        let path = trimmed
            .strip_prefix("git@github.com:")
            .or_else(|| {
                trimmed
                    .split_once("github.com/")
                    .map(|(_, remainder)| remainder)
            })
            .ok_or_else(|| IntegrationDomainError::InvalidRepository(trimmed.to_owned()))?;
        let without_suffix = path.trim_end_matches('/');
        let name = without_suffix
            .strip_suffix(".git")
            .unwrap_or(without_suffix);
        Self::new(name).map_err(|_| IntegrationDomainError::InvalidRepository(trimmed.to_owned()))
    }

    /// Returns the repository owner segment.
    #[must_use]
    pub fn owner(&self) -> &str {
        self.0.split('/').next().unwrap_or_default()
    }

    /// Returns the repository name as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for RepositoryFullName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for RepositoryFullName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
