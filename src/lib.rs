//! Taskbridge: idempotent integration of completed agent tasks.
//!
//! Given a task identifier, Taskbridge converges local task state with a
//! remote tracker: it ensures an issue exists for the task, ensures a branch
//! carries the task's changes, ensures a pull request references both, and
//! records the outcome in a durable local ledger. Re-running with unchanged
//! inputs creates no duplicates, and a run that stops partway resumes from
//! the furthest confirmed state.
//!
//! # Architecture
//!
//! Taskbridge follows hexagonal architecture principles:
//!
//! - **Domain**: Pure value types and the reconciliation state machine
//! - **Ports**: Abstract trait interfaces for the tracker, git and the ledger
//! - **Adapters**: `gh`/`git` CLI clients, YAML files, and in-memory fakes
//!
//! # Modules
//!
//! - [`integration`]: Task-to-issue/branch/pull-request reconciliation
//! - [`config`]: Environment-derived runtime settings
//! - [`telemetry`]: Tracing subscriber installation

pub mod config;
pub mod integration;
pub mod telemetry;
