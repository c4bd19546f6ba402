//! GitHub adapters driven through the `gh` command-line client.
//!
//! All remote calls go through [`GhCli`], which pins the environment to
//! non-interactive operation, bounds every call with a timeout and maps
//! `gh` failures onto [`crate::integration::ports::TrackerError`]. The
//! client honours `GH_TOKEN`/`GITHUB_TOKEN` from the environment natively,
//! so token authentication needs no extra wiring.

mod cli;
mod payload;
mod probe;
mod tracker;

pub use cli::GhCli;
pub use probe::{GhProbe, REQUIRED_SCOPES, TOKEN_PREFIXES};
pub use tracker::GitHubTracker;
