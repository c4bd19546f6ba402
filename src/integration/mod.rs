//! Task-to-integration synchronisation for Taskbridge.
//!
//! This module converges a completed, locally verified unit of agent work
//! with remote tracker state: an issue, a branch carrying the work, and a
//! pull request, with the local ledger recording the furthest confirmed
//! state. Every remote object is discovered through a deterministic name
//! derived from the task identifier, which makes each step re-entrant. The
//! module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
