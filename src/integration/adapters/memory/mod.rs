//! In-memory adapter implementations for testing.
//!
//! These adapters keep all state behind [`std::sync::RwLock`]s so tests can
//! drive reconciliation without a network, a Git checkout or a filesystem.
//! The tracker and checkout support fault injection and call counting.

mod ledger;
mod probe;
mod source;
mod tracker;
mod vcs;

pub use ledger::InMemoryLedger;
pub use probe::StaticProbe;
pub use source::InMemoryTaskSource;
pub use tracker::{InMemoryTracker, TrackerOperation};
pub use vcs::InMemoryRepository;
