//! Branch value objects and deterministic branch naming.

use super::{IntegrationDomainError, TaskKey};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix shared by every task branch.
const BRANCH_PREFIX: &str = "feature/";

/// Maximum length of a derived task branch name.
const MAX_DERIVED_LENGTH: usize = 50;

/// Maximum length of the title slug before the overall limit is applied.
const MAX_SLUG_LENGTH: usize = 30;

/// Maximum length accepted for any branch name.
const MAX_BRANCH_NAME_LENGTH: usize = 255;

/// Validated Git branch name.
///
/// Branch names must be non-empty, must not contain whitespace, colons or
/// the other characters `git check-ref-format` rejects, and must not exceed
/// `MAX_BRANCH_NAME_LENGTH` characters.
///
/// # Examples
///
///     use taskbridge::integration::domain::{BranchName, TaskKey};
///
///     let key = TaskKey::new("T001").expect("valid key");
///     let name = BranchName::for_task(&key, "Add login form").expect("valid");
///     assert_eq!(name.as_str(), "feature/t001-add-login-form");
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Creates a validated branch name.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationDomainError::InvalidBranchName`] when the value
    /// is empty, contains forbidden characters, or exceeds the length limit.
    pub fn new(value: impl Into<String>) -> Result<Self, IntegrationDomainError> {
        let raw = value.into();
        let normalized = raw.trim();

        if Self::is_invalid_branch_name(normalized) {
            return Err(IntegrationDomainError::InvalidBranchName(raw));
        }

        Ok(Self(normalized.to_owned()))
    }

    /// Derives the deterministic branch name for a task.
    ///
    /// The name is `feature/{task}-{slug}`. The task part is the identifier
    /// lowercased and otherwise verbatim; it never contains a hyphen, so
    /// distinct tasks never share a branch. The slug keeps the title's ASCII
    /// alphanumerics in lower case, collapses separators to single hyphens
    /// and is capped at 30 characters. Names longer than 50 characters are
    /// cut back to the last hyphen inside the limit. The same inputs always
    /// produce the same name.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationDomainError::InvalidBranchName`] when the task
    /// identifier alone does not fit within the length limit.
    pub fn for_task(task: &TaskKey, title: &str) -> Result<Self, IntegrationDomainError> {
        let stem = format!("{BRANCH_PREFIX}{}", task.as_str().to_ascii_lowercase());
        if stem.chars().count() > MAX_DERIVED_LENGTH {
            return Err(IntegrationDomainError::InvalidBranchName(stem));
        }

        let slug = slugify(title, MAX_SLUG_LENGTH);
        if slug.is_empty() {
            return Self::new(stem);
        }

        let full = format!("{stem}-{slug}");
        if full.chars().count() <= MAX_DERIVED_LENGTH {
            return Self::new(full);
        }

        let truncated: String = full.chars().take(MAX_DERIVED_LENGTH).collect();
        let cut = truncated
            .rsplit_once('-')
            .map_or(truncated.as_str(), |(head, _)| head);
        let candidate = if cut.chars().count() < stem.chars().count() {
            stem.as_str()
        } else {
            cut.trim_end_matches('-')
        };
        Self::new(candidate)
    }

    /// Validates branch name constraints.
    fn is_invalid_branch_name(name: &str) -> bool {
        let is_empty = name.is_empty();
        let contains_forbidden_char = name.chars().any(|ch| {
            ch.is_whitespace()
                || ch.is_control()
                || matches!(ch, ':' | '~' | '^' | '?' | '*' | '[' | '\\')
        });
        let has_forbidden_sequence = name.contains("..") || name.contains("@{") || name.contains("//");
        let has_forbidden_edge = name.starts_with(['-', '/', '.'])
            || name.ends_with(['/', '.'])
            || name.ends_with(".lock");
        let exceeds_length_limit = name.len() > MAX_BRANCH_NAME_LENGTH;

        is_empty
            || contains_forbidden_char
            || has_forbidden_sequence
            || has_forbidden_edge
            || exceeds_length_limit
    }

    /// Returns the branch name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Lowercases `value`, keeps ASCII alphanumerics, and collapses every run of
/// other characters into a single hyphen, trimming hyphens at both ends.
fn slugify(value: &str, max_len: usize) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_separator = false;
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(ch.to_ascii_lowercase());
        } else if ch.is_whitespace() || matches!(ch, '-' | '_' | '.' | '/') {
            pending_separator = true;
        }
    }
    let capped: String = slug.chars().take(max_len).collect();
    capped.trim_matches('-').to_owned()
}

impl TryFrom<String> for BranchName {
    type Error = IntegrationDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BranchName> for String {
    fn from(value: BranchName) -> Self {
        value.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Materialized task branch, as confirmed after a push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRef {
    name: BranchName,
    head: String,
    created: bool,
    committed: bool,
}

impl BranchRef {
    /// Creates a branch reference.
    #[must_use]
    pub const fn new(name: BranchName, head: String, created: bool, committed: bool) -> Self {
        Self {
            name,
            head,
            created,
            committed,
        }
    }

    /// Returns the branch name.
    #[must_use]
    pub const fn name(&self) -> &BranchName {
        &self.name
    }

    /// Returns the commit the branch pointed at after pushing.
    #[must_use]
    pub fn head(&self) -> &str {
        &self.head
    }

    /// Returns `true` when the branch did not exist locally or remotely.
    #[must_use]
    pub const fn was_created(&self) -> bool {
        self.created
    }

    /// Returns `true` when this materialization added a commit.
    #[must_use]
    pub const fn was_committed(&self) -> bool {
        self.committed
    }
}
