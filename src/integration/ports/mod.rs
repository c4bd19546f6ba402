//! Port contracts for task integration.
//!
//! Ports define the infrastructure-agnostic interfaces the reconciler drives:
//! the remote tracker, the local version control checkout, the durable
//! ledger, the capability probe and the task/report source.

pub mod ledger;
pub mod probe;
pub mod source;
pub mod tracker;
pub mod vcs;

pub use ledger::{LedgerError, LedgerResult, LedgerStore, TaskLease};
pub use probe::CapabilityProbe;
pub use source::{TaskSource, TaskSourceError, TaskSourceResult};
pub use tracker::{IssueTracker, TrackerError, TrackerResult};
pub use vcs::{BranchStart, VcsError, VcsResult, VersionControl};
