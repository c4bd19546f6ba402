//! Ledger entries: the durable per-task integration checkpoint.

use super::{
    BranchName, ErrorKind, IntegrationDomainError, IssueRef, PullRequestRef, ReconcileStage,
    TaskKey,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Integration status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerStatus {
    /// Integration has started but not been confirmed.
    Pending,
    /// Every required remote object has been confirmed.
    Integrated,
    /// The last run ended with a non-retryable error.
    Failed,
}

impl LedgerStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Integrated => "integrated",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for LedgerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error recorded against the stage at which a run stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedError {
    /// Failure classification.
    pub kind: ErrorKind,
    /// Furthest stage reached before the failure.
    pub stage: ReconcileStage,
    /// Diagnostic message.
    pub message: String,
}

/// Per-task ledger record.
///
/// Invariant: an `integrated` entry carries an issue reference and, unless
/// the pull request was deliberately skipped, a pull request reference.
/// Entries are only ever overwritten, never deleted implicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    task: TaskKey,
    status: LedgerStatus,
    stage: ReconcileStage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    branch: Option<BranchName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    issue: Option<IssueRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pull_request: Option<PullRequestRef>,
    #[serde(default)]
    pr_skipped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    report_digest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<RecordedError>,
    updated_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Creates a pending entry for a task seen for the first time.
    #[must_use]
    pub fn new(task: TaskKey, clock: &impl Clock) -> Self {
        Self {
            task,
            status: LedgerStatus::Pending,
            stage: ReconcileStage::Init,
            branch: None,
            issue: None,
            pull_request: None,
            pr_skipped: false,
            report_digest: None,
            error: None,
            updated_at: clock.utc(),
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn task(&self) -> &TaskKey {
        &self.task
    }

    /// Returns the integration status.
    #[must_use]
    pub const fn status(&self) -> LedgerStatus {
        self.status
    }

    /// Returns the furthest stage recorded.
    #[must_use]
    pub const fn stage(&self) -> ReconcileStage {
        self.stage
    }

    /// Returns the task branch, if materialized.
    #[must_use]
    pub const fn branch(&self) -> Option<&BranchName> {
        self.branch.as_ref()
    }

    /// Returns the issue reference, if resolved.
    #[must_use]
    pub const fn issue(&self) -> Option<&IssueRef> {
        self.issue.as_ref()
    }

    /// Returns the pull request reference, if resolved.
    #[must_use]
    pub const fn pull_request(&self) -> Option<&PullRequestRef> {
        self.pull_request.as_ref()
    }

    /// Returns `true` when integration deliberately skipped the pull request.
    #[must_use]
    pub const fn pr_skipped(&self) -> bool {
        self.pr_skipped
    }

    /// Returns the digest of the report last integrated.
    #[must_use]
    pub fn report_digest(&self) -> Option<&str> {
        self.report_digest.as_deref()
    }

    /// Returns the error that stopped the last run, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&RecordedError> {
        self.error.as_ref()
    }

    /// Returns the last-updated timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Records the stage reached by the current run.
    pub fn record_stage(&mut self, stage: ReconcileStage, clock: &impl Clock) {
        self.stage = stage;
        self.touch(clock);
    }

    /// Records the resolved issue.
    pub fn record_issue(&mut self, issue: IssueRef, clock: &impl Clock) {
        self.issue = Some(issue);
        self.touch(clock);
    }

    /// Records the materialized branch.
    pub fn record_branch(&mut self, branch: BranchName, clock: &impl Clock) {
        self.branch = Some(branch);
        self.touch(clock);
    }

    /// Records the resolved pull request.
    pub fn record_pull_request(&mut self, pull_request: PullRequestRef, clock: &impl Clock) {
        self.pull_request = Some(pull_request);
        self.pr_skipped = false;
        self.touch(clock);
    }

    /// Records the digest of the report being integrated.
    pub fn record_report_digest(&mut self, digest: Option<String>, clock: &impl Clock) {
        self.report_digest = digest;
        self.touch(clock);
    }

    /// Marks the entry as in progress, optionally noting why the run stopped.
    pub fn mark_pending(&mut self, error: Option<RecordedError>, clock: &impl Clock) {
        self.status = LedgerStatus::Pending;
        self.error = error;
        self.touch(clock);
    }

    /// Marks the entry as failed with the recorded error.
    pub fn mark_failed(&mut self, error: RecordedError, clock: &impl Clock) {
        self.status = LedgerStatus::Failed;
        self.error = Some(error);
        self.touch(clock);
    }

    /// Marks the entry as integrated.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationDomainError::IncompleteIntegration`] when the
    /// issue reference, or the pull request reference outside issue-only
    /// mode, is missing.
    pub fn mark_integrated(
        &mut self,
        pr_skipped: bool,
        clock: &impl Clock,
    ) -> Result<(), IntegrationDomainError> {
        self.pr_skipped = pr_skipped;
        self.status = LedgerStatus::Integrated;
        self.stage = ReconcileStage::LedgerUpdated;
        self.error = None;
        if let Err(err) = self.validate() {
            self.status = LedgerStatus::Pending;
            return Err(err);
        }
        self.touch(clock);
        Ok(())
    }

    /// Checks the integrated-entry invariant.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationDomainError::IncompleteIntegration`] when an
    /// integrated entry lacks a required reference.
    pub fn validate(&self) -> Result<(), IntegrationDomainError> {
        if self.status != LedgerStatus::Integrated {
            return Ok(());
        }
        let missing = if self.issue.as_ref().is_none_or(|issue| issue.url.is_empty()) {
            Some("issue")
        } else if !self.pr_skipped
            && self
                .pull_request
                .as_ref()
                .is_none_or(|pr| pr.url.is_empty())
        {
            Some("pull request")
        } else {
            None
        };
        missing.map_or(Ok(()), |name| {
            Err(IntegrationDomainError::IncompleteIntegration {
                task: self.task.to_string(),
                missing: name,
            })
        })
    }

    /// Combines this entry with the previously stored one so that writes
    /// are monotonic.
    ///
    /// A `pending` write never downgrades an `integrated` entry: the stored
    /// status and stage are kept and, since an integrated entry records no
    /// error, the pending write's error is dropped. Remote references absent
    /// from this entry are carried over from the stored one so that
    /// confirmed objects are never forgotten.
    #[must_use]
    pub fn supersede(mut self, previous: Option<&Self>) -> Self {
        let Some(stored) = previous else {
            return self;
        };
        if self.issue.is_none() {
            self.issue.clone_from(&stored.issue);
        }
        if self.branch.is_none() {
            self.branch.clone_from(&stored.branch);
        }
        if self.pull_request.is_none() && !self.pr_skipped {
            self.pull_request.clone_from(&stored.pull_request);
        }
        if self.report_digest.is_none() {
            self.report_digest.clone_from(&stored.report_digest);
        }
        if stored.status == LedgerStatus::Integrated && self.status == LedgerStatus::Pending {
            self.status = LedgerStatus::Integrated;
            self.stage = stored.stage;
            self.pr_skipped = stored.pr_skipped;
            self.error = None;
        }
        self
    }

    /// Returns `true` when [`Self::supersede`] kept a stored integrated
    /// status that this entry would otherwise have downgraded.
    #[must_use]
    pub fn would_downgrade(&self, previous: Option<&Self>) -> bool {
        previous.is_some_and(|stored| {
            stored.status == LedgerStatus::Integrated && self.status == LedgerStatus::Pending
        })
    }

    /// Updates the timestamp to the current clock time.
    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}
