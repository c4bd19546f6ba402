//! Capability probe over `gh auth status` and environment tokens.

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::cli::GhCli;
use crate::integration::{
    domain::{AuthMethod, AuthState, RepositoryFullName},
    ports::{CapabilityProbe, TrackerError},
};

/// OAuth scopes the integrator needs for issues, pushes and pull requests.
pub const REQUIRED_SCOPES: [&str; 1] = ["repo"];

/// Prefixes carried by GitHub tokens: personal access (classic and
/// fine-grained), OAuth, GitHub App user-to-server, installation (the
/// `GITHUB_TOKEN` of Actions) and refresh tokens.
pub const TOKEN_PREFIXES: [&str; 6] = ["ghp_", "github_pat_", "gho_", "ghu_", "ghs_", "ghr_"];

/// Probe that prefers an existing `gh` session and falls back to a token.
///
/// The token value is only inspected for its prefix; it is never logged.
#[derive(Clone)]
pub struct GhProbe {
    cli: GhCli,
    token: Option<String>,
}

impl std::fmt::Debug for GhProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GhProbe")
            .field("cli", &self.cli)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl GhProbe {
    /// Creates a probe; `token` is the value of `GH_TOKEN` or `GITHUB_TOKEN`.
    #[must_use]
    pub const fn new(cli: GhCli, token: Option<String>) -> Self {
        Self { cli, token }
    }

    async fn session_state(&self) -> Result<Option<AuthState>, TrackerError> {
        let output = self.cli.run(&["auth", "status"], None).await?;
        if !output.status.success() {
            return Ok(None);
        }
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(Some(state_from_status(&text)))
    }

    async fn token_state(&self, token: &str) -> AuthState {
        if !has_known_prefix(token) {
            return AuthState::unavailable(format!(
                "token does not start with one of {}",
                TOKEN_PREFIXES.join(", ")
            ));
        }
        let endpoint = repository_endpoint(self.cli.repository());
        if let Err(err) = self
            .cli
            .run_checked(&["api", endpoint.as_str(), "--jq", ".full_name"], None)
            .await
        {
            return AuthState::unavailable(format!("token rejected: {err}"));
        }
        AuthState::authenticated(AuthMethod::Token, self.token_login().await)
    }

    /// Installation tokens have no user, so the login is best effort.
    async fn token_login(&self) -> Option<String> {
        match self
            .cli
            .run_checked(&["api", "user", "--jq", ".login"], None)
            .await
        {
            Ok(stdout) => Some(String::from_utf8_lossy(&stdout).trim().to_owned())
                .filter(|login| !login.is_empty()),
            Err(err) => {
                debug!(error = %err, "token carries no user login");
                None
            }
        }
    }
}

#[async_trait]
impl CapabilityProbe for GhProbe {
    #[instrument(skip_all)]
    async fn check_auth(&self) -> AuthState {
        match self.session_state().await {
            Ok(Some(state)) => {
                debug!(method = %state.method, ok = state.ok, "gh session found");
                return state;
            }
            Ok(None) => debug!("no gh session"),
            Err(TrackerError::Client(err)) => {
                debug!(error = %err, "gh is not runnable");
                return AuthState::unavailable(format!("gh CLI unavailable: {err}"));
            }
            Err(err) => debug!(error = %err, "gh auth status failed"),
        }
        let Some(token) = self.token.as_deref() else {
            return AuthState::unavailable(
                "no gh session and neither GH_TOKEN nor GITHUB_TOKEN is set",
            );
        };
        self.token_state(token).await
    }
}

/// Read-only endpoint any token able to use the repository can fetch.
fn repository_endpoint(repository: &RepositoryFullName) -> String {
    format!("repos/{repository}")
}

fn has_known_prefix(token: &str) -> bool {
    TOKEN_PREFIXES.iter().any(|prefix| token.starts_with(prefix))
}

/// Builds the probe result from successful `gh auth status` output.
fn state_from_status(text: &str) -> AuthState {
    let method = if text.contains("GH_TOKEN") || text.contains("GITHUB_TOKEN") {
        AuthMethod::Token
    } else {
        AuthMethod::Cli
    };
    let state = AuthState::authenticated(method, parse_login(text));
    let Some(granted) = parse_scopes(text) else {
        return state;
    };
    state.with_missing_scopes(missing_scopes(&granted))
}

/// Reads the login from `Logged in to host account NAME` or the older
/// `Logged in to host as NAME` form.
fn parse_login(text: &str) -> Option<String> {
    text.lines()
        .filter(|line| line.contains("Logged in to"))
        .find_map(|line| {
            let (_, rest) = line
                .split_once(" account ")
                .or_else(|| line.split_once(" as "))?;
            rest.split_whitespace().next().map(ToOwned::to_owned)
        })
}

/// Reads the `Token scopes:` line; `None` when gh does not report scopes.
fn parse_scopes(text: &str) -> Option<Vec<String>> {
    let (_, list) = text
        .lines()
        .find_map(|line| line.split_once("Token scopes:"))?;
    Some(
        list.split(',')
            .map(|scope| scope.trim().trim_matches('\'').trim_matches('"').to_owned())
            .filter(|scope| !scope.is_empty() && scope != "none")
            .collect(),
    )
}

fn missing_scopes(granted: &[String]) -> Vec<String> {
    REQUIRED_SCOPES
        .iter()
        .filter(|required| !granted.iter().any(|scope| scope == *required))
        .map(|required| (*required).to_owned())
        .collect()
}
