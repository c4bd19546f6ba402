//! Capability probe results and the policy applied when auth is missing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Channel through which the remote tracker is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// An authenticated `gh` CLI session.
    Cli,
    /// A personal access token from the environment.
    Token,
    /// No usable channel.
    None,
}

impl AuthMethod {
    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cli => "cli",
            Self::Token => "token",
            Self::None => "none",
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured outcome of probing for remote credentials.
///
/// Probing never fails; an unusable channel is reported with `ok = false`
/// and a diagnostic detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthState {
    /// Whether an authenticated, sufficiently scoped channel exists.
    pub ok: bool,
    /// The channel that was found.
    pub method: AuthMethod,
    /// Required scopes the credential lacks.
    pub missing_scopes: Vec<String>,
    /// Authenticated login, when the probe could read it.
    pub login: Option<String>,
    /// Human-readable diagnostic.
    pub detail: String,
}

impl AuthState {
    /// Creates a usable state for `method`.
    #[must_use]
    pub fn authenticated(method: AuthMethod, login: Option<String>) -> Self {
        let detail = login.as_ref().map_or_else(
            || format!("authenticated via {method}"),
            |name| format!("authenticated as {name} via {method}"),
        );
        Self {
            ok: true,
            method,
            missing_scopes: Vec::new(),
            login,
            detail,
        }
    }

    /// Creates an unusable state with a diagnostic.
    #[must_use]
    pub fn unavailable(detail: impl Into<String>) -> Self {
        Self {
            ok: false,
            method: AuthMethod::None,
            missing_scopes: Vec::new(),
            login: None,
            detail: detail.into(),
        }
    }

    /// Records scopes the credential lacks; any missing scope makes the
    /// state unusable.
    #[must_use]
    pub fn with_missing_scopes(mut self, scopes: Vec<String>) -> Self {
        if !scopes.is_empty() {
            self.ok = false;
            self.detail = format!(
                "{} but missing scopes: {}",
                self.detail,
                scopes.join(", ")
            );
        }
        self.missing_scopes = scopes;
        self
    }
}

/// Caller-selected reaction to a probe reporting `ok = false`.
///
/// The reconciler never prompts. `Interactive` and `NonInteractive` both end
/// the run with `AuthRequired`; they differ in what the caller does next,
/// which [`AuthPolicy::login_hint`] captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthPolicy {
    /// Fail with `AuthRequired`; an interactive caller may prompt and retry.
    #[default]
    Interactive,
    /// Fail fast with `AuthRequired`; used in CI.
    NonInteractive,
    /// Complete locally without touching the remote tracker.
    Skip,
}

/// Guidance shown to a person whose run stopped for lack of a credential.
const LOGIN_HINT: &str =
    "run `gh auth login` or export GH_TOKEN with the repo scope, then re-run the same command";

impl AuthPolicy {
    /// Returns the guidance to show after `AuthRequired`, or `None` when no
    /// person is expected to act on it.
    #[must_use]
    pub const fn login_hint(self) -> Option<&'static str> {
        match self {
            Self::Interactive => Some(LOGIN_HINT),
            Self::NonInteractive | Self::Skip => None,
        }
    }
}
