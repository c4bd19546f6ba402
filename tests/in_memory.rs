//! End-to-end reconciliation tests over in-memory adapters.
//!
//! Tests are organized into modules by behaviour:
//! - `idempotence_tests`: Repeated runs converge on one set of remote objects
//! - `recovery_tests`: Failed runs are recorded and resumed
//! - `retry_tests`: Transient failures within and beyond the retry budget
//! - `concurrency_tests`: Same-task serialisation and cross-task parallelism
//! - `cancellation_tests`: Cancellation at suspension points
//! - `conflict_tests`: Lost responses, naming and push conflicts
//! - `policy_tests`: Auth policies and issue-only integration

#![expect(
    clippy::expect_used,
    reason = "Test code uses expect for assertion clarity"
)]

mod in_memory {
    pub mod harness;

    mod cancellation_tests;
    mod concurrency_tests;
    mod conflict_tests;
    mod idempotence_tests;
    mod policy_tests;
    mod recovery_tests;
    mod retry_tests;
}
