//! Diagnostic tracing for the integrator.
//!
//! Diagnostics go to stderr and are filtered by `RUST_LOG`. Durable
//! integration state lives in the ledger and is unaffected by the filter.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "warn";

/// Installs the global tracing subscriber.
///
/// Reads `RUST_LOG`, defaulting to `warn`, and writes compact output to
/// stderr.
///
/// ```text
/// RUST_LOG=taskbridge=debug taskbridge T001
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
