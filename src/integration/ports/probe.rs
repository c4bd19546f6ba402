//! Capability probe port.

use crate::integration::domain::AuthState;
use async_trait::async_trait;

/// Detects whether an authenticated channel to the remote tracker exists.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CapabilityProbe: Send + Sync {
    /// Probes the available credentials.
    ///
    /// Never fails: an unusable channel is reported as an [`AuthState`] with
    /// `ok = false`.
    async fn check_auth(&self) -> AuthState;
}
