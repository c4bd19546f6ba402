//! Conventional-commit messages for task changes.

use super::{IssueNumber, Report, TaskSpec};
use std::fmt;

/// Maximum length of the commit header summary.
const MAX_SUMMARY_LENGTH: usize = 50;

/// Number of acceptance criteria listed when no report summary exists.
const FALLBACK_CRITERIA: usize = 3;

/// Trailer key carrying the report digest.
const REPORT_TRAILER: &str = "Agent-Report";

/// Commit message in `{type}({task}): {summary}` form.
///
/// # Examples
///
///     use taskbridge::integration::domain::{CommitMessage, TaskKey, TaskSpec};
///
///     let task = TaskSpec::new(TaskKey::new("T001").expect("key"), "Fix login bug")
///         .expect("task");
///     let message = CommitMessage::for_task(&task, None, None);
///     assert_eq!(message.header(), "fix(T001): fix login bug");
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitMessage {
    header: String,
    body: Vec<String>,
    footers: Vec<String>,
}

impl CommitMessage {
    /// Builds the commit message for a task's change set.
    ///
    /// The body lists the report summary, falling back to the goal and the
    /// first acceptance criteria. Footers carry `Closes #{issue}` once an
    /// issue is known and an `Agent-Report` trailer with the report digest.
    #[must_use]
    pub fn for_task(task: &TaskSpec, report: Option<&Report>, issue: Option<IssueNumber>) -> Self {
        let header = format!(
            "{}({}): {}",
            task.change_type().commit_type(),
            task.key(),
            summarize(task.title())
        );

        let body: Vec<String> = report.filter(|r| !r.summary.is_empty()).map_or_else(
            || {
                std::iter::once(task.goal())
                    .filter(|goal| !goal.is_empty())
                    .chain(
                        task.acceptance_criteria()
                            .iter()
                            .take(FALLBACK_CRITERIA)
                            .map(String::as_str),
                    )
                    .map(|line| format!("- {line}"))
                    .collect()
            },
            |r| r.summary.iter().map(|line| format!("- {line}")).collect(),
        );

        let mut footers = Vec::new();
        if let Some(number) = issue {
            footers.push(format!("Closes #{number}"));
        }
        if let Some(r) = report {
            footers.push(format!("{REPORT_TRAILER}: {}", r.digest()));
        }

        Self {
            header,
            body,
            footers,
        }
    }

    /// Returns the header line.
    #[must_use]
    pub fn header(&self) -> &str {
        &self.header
    }

    /// Returns the body lines.
    #[must_use]
    pub fn body(&self) -> &[String] {
        &self.body
    }

    /// Returns the footer lines.
    #[must_use]
    pub fn footers(&self) -> &[String] {
        &self.footers
    }
}

/// Lowercases the title, drops punctuation other than hyphens, and caps the
/// result at `MAX_SUMMARY_LENGTH` characters.
fn summarize(title: &str) -> String {
    let cleaned: String = title
        .to_lowercase()
        .chars()
        .filter(|ch| ch.is_alphanumeric() || ch.is_whitespace() || matches!(ch, '-' | '_'))
        .collect();
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .chars()
        .take(MAX_SUMMARY_LENGTH)
        .collect::<String>()
        .trim_end()
        .to_owned()
}

impl fmt::Display for CommitMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header)?;
        if !self.body.is_empty() {
            write!(f, "\n\n{}", self.body.join("\n"))?;
        }
        if !self.footers.is_empty() {
            write!(f, "\n\n{}", self.footers.join("\n"))?;
        }
        Ok(())
    }
}
