//! Step definitions for task integration reconciliation scenarios.

pub mod world;
mod given;
mod when;
mod then;
