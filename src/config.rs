//! Runtime configuration for the integrator.
//!
//! Configuration is assembled from the process environment and then
//! adjusted by command-line flags through the `with_*` builder methods.
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `GITHUB_REPOSITORY` | `owner/repo`; detected from the remote URL when unset |
//! | `GH_TOKEN`, `GITHUB_TOKEN` | Token used when no `gh` session exists |
//! | `CI` | Truthy selects the non-interactive auth policy |
//! | `TASKBRIDGE_WORKDIR` | Repository working tree (default `.`) |
//! | `TASKBRIDGE_LEDGER` | Ledger path (default `.agent/ledger.yaml`) |
//! | `TASKBRIDGE_MAX_RETRIES` | Retries after the first attempt (default 3) |
//! | `TASKBRIDGE_RETRY_BASE_MS` | First backoff delay (default 1000) |
//! | `TASKBRIDGE_REMOTE_TIMEOUT_SECS` | Subprocess timeout (default 60) |
//! | `GITHUB_PROJECT_NUMBER` | Project board receiving task issues |
//! | `GITHUB_PROJECT_OWNER` | Board owner (default repository owner) |
//! | `GITHUB_PROJECT_STATUS` | Status set on added items |

use std::env;
use std::fmt;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

use crate::integration::{
    domain::{AuthPolicy, IntegrationDomainError, ProjectBoard, RepositoryFullName},
    services::{DEFAULT_BASE_BRANCH, ReconcileOptions, RetryPolicy},
};

const DEFAULT_TASKS_DIR: &str = ".agent/tasks";
const DEFAULT_REPORTS_DIR: &str = ".agent/reports";
const DEFAULT_LEDGER_PATH: &str = ".agent/ledger.yaml";
const DEFAULT_REMOTE: &str = "origin";
const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors raised while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric variable could not be parsed.
    #[error("invalid {variable}: {value:?} is not a non-negative integer")]
    InvalidNumber {
        /// Variable name.
        variable: &'static str,
        /// Raw value.
        value: String,
    },

    /// The repository name is malformed.
    #[error(transparent)]
    Repository(#[from] IntegrationDomainError),
}

/// Settings shared by every reconciliation in one process.
#[derive(Clone, PartialEq, Eq)]
pub struct IntegrationConfig {
    repository: Option<RepositoryFullName>,
    workdir: Utf8PathBuf,
    tasks_dir: Utf8PathBuf,
    reports_dir: Utf8PathBuf,
    ledger_path: Utf8PathBuf,
    auth_policy: AuthPolicy,
    retry: RetryPolicy,
    project_board: Option<ProjectBoard>,
    remote: String,
    fallback_base_branch: String,
    remote_timeout: Duration,
    token: Option<String>,
}

impl fmt::Debug for IntegrationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntegrationConfig")
            .field("repository", &self.repository)
            .field("workdir", &self.workdir)
            .field("tasks_dir", &self.tasks_dir)
            .field("reports_dir", &self.reports_dir)
            .field("ledger_path", &self.ledger_path)
            .field("auth_policy", &self.auth_policy)
            .field("retry", &self.retry)
            .field("project_board", &self.project_board)
            .field("remote", &self.remote)
            .field("fallback_base_branch", &self.fallback_base_branch)
            .field("remote_timeout", &self.remote_timeout)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            repository: None,
            workdir: Utf8PathBuf::from("."),
            tasks_dir: Utf8PathBuf::from(DEFAULT_TASKS_DIR),
            reports_dir: Utf8PathBuf::from(DEFAULT_REPORTS_DIR),
            ledger_path: Utf8PathBuf::from(DEFAULT_LEDGER_PATH),
            auth_policy: AuthPolicy::Interactive,
            retry: RetryPolicy::default(),
            project_board: None,
            remote: DEFAULT_REMOTE.to_owned(),
            fallback_base_branch: DEFAULT_BASE_BRANCH.to_owned(),
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
            token: None,
        }
    }
}

impl IntegrationConfig {
    /// Reads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable is set but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads configuration through `lookup`, which returns a variable's
    /// value or `None` when it is unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable is set but malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(repository) = get("GITHUB_REPOSITORY") {
            config.repository = Some(RepositoryFullName::new(repository)?);
        }
        if let Some(workdir) = get("TASKBRIDGE_WORKDIR") {
            config.workdir = Utf8PathBuf::from(workdir);
        }
        if let Some(ledger) = get("TASKBRIDGE_LEDGER") {
            config.ledger_path = Utf8PathBuf::from(ledger);
        }
        if get("CI").is_some_and(|value| is_truthy(&value)) {
            config.auth_policy = AuthPolicy::NonInteractive;
        }
        config.token = get("GH_TOKEN").or_else(|| get("GITHUB_TOKEN"));

        let max_retries = parse_number(&get, "TASKBRIDGE_MAX_RETRIES")?;
        let base_ms = parse_number(&get, "TASKBRIDGE_RETRY_BASE_MS")?;
        let retries = max_retries.map_or(Ok(config.retry.max_retries()), |value| {
            u32::try_from(value).map_err(|_| ConfigError::InvalidNumber {
                variable: "TASKBRIDGE_MAX_RETRIES",
                value: value.to_string(),
            })
        })?;
        let base_delay = base_ms.map_or(config.retry.base_delay(), Duration::from_millis);
        config.retry = RetryPolicy::new(retries, base_delay);

        if let Some(secs) = parse_number(&get, "TASKBRIDGE_REMOTE_TIMEOUT_SECS")? {
            config.remote_timeout = Duration::from_secs(secs);
        }
        config.project_board = parse_number(&get, "GITHUB_PROJECT_NUMBER")?.map(|number| {
            let mut board = ProjectBoard::new(number);
            board.owner = get("GITHUB_PROJECT_OWNER");
            board.status = get("GITHUB_PROJECT_STATUS");
            board
        });
        Ok(config)
    }

    /// Sets the repository, overriding detection.
    #[must_use]
    pub fn with_repository(mut self, repository: RepositoryFullName) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Sets the repository working tree.
    #[must_use]
    pub fn with_workdir(mut self, workdir: impl Into<Utf8PathBuf>) -> Self {
        self.workdir = workdir.into();
        self
    }

    /// Sets the ledger path.
    #[must_use]
    pub fn with_ledger_path(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.ledger_path = path.into();
        self
    }

    /// Selects the auth policy.
    #[must_use]
    pub const fn with_auth_policy(mut self, policy: AuthPolicy) -> Self {
        self.auth_policy = policy;
        self
    }

    /// Sets the retry policy for remote calls.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the project board target.
    #[must_use]
    pub fn with_project_board(mut self, board: Option<ProjectBoard>) -> Self {
        self.project_board = board;
        self
    }

    /// Sets the token used when no `gh` session exists.
    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// Returns the configured repository, if any.
    #[must_use]
    pub const fn repository(&self) -> Option<&RepositoryFullName> {
        self.repository.as_ref()
    }

    /// Returns the repository working tree.
    #[must_use]
    pub fn workdir(&self) -> &Utf8Path {
        &self.workdir
    }

    /// Returns the task definition directory, resolved against the workdir.
    #[must_use]
    pub fn tasks_dir(&self) -> Utf8PathBuf {
        self.workdir.join(&self.tasks_dir)
    }

    /// Returns the report directory, resolved against the workdir.
    #[must_use]
    pub fn reports_dir(&self) -> Utf8PathBuf {
        self.workdir.join(&self.reports_dir)
    }

    /// Returns the ledger path, resolved against the workdir.
    #[must_use]
    pub fn ledger_path(&self) -> Utf8PathBuf {
        self.workdir.join(&self.ledger_path)
    }

    /// Returns the auth policy.
    #[must_use]
    pub const fn auth_policy(&self) -> AuthPolicy {
        self.auth_policy
    }

    /// Returns the retry policy.
    #[must_use]
    pub const fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// Returns the project board target.
    #[must_use]
    pub const fn project_board(&self) -> Option<&ProjectBoard> {
        self.project_board.as_ref()
    }

    /// Returns the git remote name.
    #[must_use]
    pub fn remote(&self) -> &str {
        &self.remote
    }

    /// Returns the subprocess timeout.
    #[must_use]
    pub const fn remote_timeout(&self) -> Duration {
        self.remote_timeout
    }

    /// Returns the configured token.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Builds per-run options from this configuration.
    #[must_use]
    pub fn reconcile_options(&self, skip_pr: bool) -> ReconcileOptions {
        ReconcileOptions::default()
            .with_skip_pr(skip_pr)
            .with_auth_policy(self.auth_policy)
            .with_project_board(self.project_board.clone())
            .with_fallback_base_branch(self.fallback_base_branch.clone())
    }
}

fn is_truthy(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "" | "0" | "false" | "no" | "off"
    )
}

fn parse_number<G>(get: &G, variable: &'static str) -> Result<Option<u64>, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    get(variable)
        .map(|value| {
            value
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidNumber { variable, value })
        })
        .transpose()
}
