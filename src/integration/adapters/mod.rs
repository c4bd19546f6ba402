//! Adapters implementing the integration ports.
//!
//! # Available Adapters
//!
//! - [`memory`]: thread-safe in-memory tracker, checkout, ledger, probe and
//!   task source for tests
//! - [`github`]: `gh` CLI backed tracker and capability probe
//! - [`git`]: `git` CLI backed checkout
//! - [`yaml`]: file-backed ledger and task/report source
//! - [`codeowners`]: CODEOWNERS discovery in a working tree

pub mod codeowners;
pub mod git;
pub mod github;
pub mod memory;
pub mod yaml;
