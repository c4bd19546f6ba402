//! Verified work reports produced by agent execution.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Number of digest bytes rendered in commit trailers and ledger entries.
const DIGEST_BYTES: usize = 6;

/// Outcome of verifying one acceptance criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionResult {
    /// Criterion text as stated in the task.
    pub criterion: String,
    /// Whether verification passed.
    pub passed: bool,
    /// Optional supporting evidence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
}

/// Descriptor of one modified artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactChange {
    /// Repository-relative path.
    pub path: String,
    /// What changed.
    #[serde(default)]
    pub description: String,
}

/// Commands run during verification and their results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    /// Commands executed.
    #[serde(default)]
    pub commands_run: Vec<String>,
    /// Result lines.
    #[serde(default)]
    pub results: Vec<String>,
}

impl Verification {
    /// Returns `true` when neither commands nor results were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands_run.is_empty() && self.results.is_empty()
    }
}

/// Report describing the verified outcome of executing a task.
///
/// Reports are schema-validated upstream; this type only reads the fields
/// reconciliation needs and tolerates absent optional sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Reported execution status.
    #[serde(default = "unknown_status")]
    pub status: String,
    /// Summary lines.
    #[serde(default)]
    pub summary: Vec<String>,
    /// Per-criterion verification outcome.
    #[serde(default, rename = "acceptance_criteria_results")]
    pub criteria_results: Vec<CriterionResult>,
    /// Modified artifacts.
    #[serde(default)]
    pub files_modified: Vec<ArtifactChange>,
    /// Verification commands and results.
    #[serde(default)]
    pub verification: Verification,
    /// Risk notes.
    #[serde(default)]
    pub risks: Vec<String>,
    /// Suggested follow-ups.
    #[serde(default)]
    pub next_steps: Vec<String>,
}

fn unknown_status() -> String {
    "unknown".to_owned()
}

impl Report {
    /// Returns `true` when the report lists modified artifacts.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.files_modified.is_empty()
    }

    /// Returns `true` when every recorded criterion passed.
    #[must_use]
    pub fn all_criteria_passed(&self) -> bool {
        self.criteria_results.iter().all(|result| result.passed)
    }

    /// Returns the modified artifact paths.
    #[must_use]
    pub fn changed_paths(&self) -> Vec<String> {
        self.files_modified
            .iter()
            .map(|change| change.path.clone())
            .collect()
    }

    /// Returns a short, stable digest of the report content.
    ///
    /// The digest is the first six bytes of the SHA-256 of the report's JSON
    /// form, hex encoded.
    #[must_use]
    pub fn digest(&self) -> String {
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        let hash = Sha256::digest(&canonical);
        hash.iter()
            .take(DIGEST_BYTES)
            .map(|byte| format!("{byte:02x}"))
            .collect()
    }
}
