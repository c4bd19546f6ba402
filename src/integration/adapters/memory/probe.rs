//! Fixed-answer capability probe.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::integration::{
    domain::{AuthMethod, AuthState},
    ports::CapabilityProbe,
};

/// Probe that always reports the same [`AuthState`].
#[derive(Debug, Clone)]
pub struct StaticProbe {
    state: AuthState,
    calls: Arc<AtomicUsize>,
}

impl StaticProbe {
    /// Creates a probe reporting `state`.
    #[must_use]
    pub fn new(state: AuthState) -> Self {
        Self {
            state,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Creates a probe reporting an authenticated CLI session.
    #[must_use]
    pub fn authenticated() -> Self {
        Self::new(AuthState::authenticated(
            AuthMethod::Cli,
            Some("octocat".to_owned()),
        ))
    }

    /// Creates a probe reporting that no credential is available.
    #[must_use]
    pub fn unauthenticated() -> Self {
        Self::new(AuthState::unavailable("no credentials configured"))
    }

    /// Returns how many times the probe ran.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CapabilityProbe for StaticProbe {
    async fn check_auth(&self) -> AuthState {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.state.clone()
    }
}
