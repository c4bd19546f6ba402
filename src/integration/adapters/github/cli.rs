//! Non-interactive `gh` invocation and failure classification.

use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::integration::{
    domain::RepositoryFullName,
    ports::{TrackerError, TrackerResult},
};

/// Builds a `gh` command that never prompts and emits plain output.
fn gh_command() -> Command {
    let mut command = Command::new("gh");
    command
        .env("GH_NO_UPDATE_NOTIFIER", "1")
        .env("NO_COLOR", "1")
        .env("GH_PROMPT_DISABLED", "1")
        .kill_on_drop(true);
    command
}

/// `gh` client scoped to one repository.
#[derive(Debug, Clone)]
pub struct GhCli {
    repository: RepositoryFullName,
    timeout: Duration,
}

impl GhCli {
    /// Creates a client for `repository` with a 60 second call timeout.
    #[must_use]
    pub const fn new(repository: RepositoryFullName) -> Self {
        Self {
            repository,
            timeout: Duration::from_secs(60),
        }
    }

    /// Bounds every call by `timeout`.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the target repository.
    #[must_use]
    pub const fn repository(&self) -> &RepositoryFullName {
        &self.repository
    }

    /// Runs `gh` with `args`, feeding `input` on stdin when given.
    ///
    /// A non-zero exit is returned as output, not as an error; only spawn
    /// failures and timeouts are errors.
    pub(super) async fn run(&self, args: &[&str], input: Option<Vec<u8>>) -> TrackerResult<Output> {
        let mut command = gh_command();
        command
            .args(args)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        debug!(args = %args.join(" "), "running gh");

        let call = async move {
            let mut child = command.spawn()?;
            if let Some(bytes) = input
                && let Some(mut stdin) = child.stdin.take()
            {
                stdin.write_all(&bytes).await?;
            }
            child.wait_with_output().await
        };
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| {
                TrackerError::Transient(format!(
                    "gh {} timed out after {}s",
                    args.first().copied().unwrap_or_default(),
                    self.timeout.as_secs()
                ))
            })?
            .map_err(TrackerError::client)
    }

    /// Runs `gh` and returns stdout, classifying failures.
    pub(super) async fn run_checked(
        &self,
        args: &[&str],
        input: Option<Vec<u8>>,
    ) -> TrackerResult<Vec<u8>> {
        let output = self.run(args, input).await?;
        if output.status.success() {
            return Ok(output.stdout);
        }
        Err(classify(&String::from_utf8_lossy(&output.stderr)))
    }

    /// Calls the REST API.
    ///
    /// `fields` are sent as query parameters for `GET` and `payload` as the
    /// JSON request body otherwise.
    pub(super) async fn api(
        &self,
        method: &str,
        endpoint: &str,
        fields: &[(&str, &str)],
        payload: Option<&serde_json::Value>,
    ) -> TrackerResult<Vec<u8>> {
        let pairs: Vec<String> = fields
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        let mut args = vec!["api", "--method", method, endpoint];
        for pair in &pairs {
            args.push("-f");
            args.push(pair.as_str());
        }
        let input = payload
            .map(serde_json::to_vec)
            .transpose()
            .map_err(TrackerError::client)?;
        if input.is_some() {
            args.push("--input");
            args.push("-");
        }
        self.run_checked(&args, input).await
    }
}

/// Extracts the status code from `gh`'s `(HTTP 404)` error suffix.
fn http_status(stderr: &str) -> Option<u16> {
    let (_, tail) = stderr.rsplit_once("HTTP ")?;
    let digits: String = tail.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Maps a failed `gh` invocation onto a tracker error.
pub(super) fn classify(stderr: &str) -> TrackerError {
    let message = stderr.trim().to_owned();
    let lowered = message.to_lowercase();
    let rate_limited = lowered.contains("rate limit");
    match http_status(&message) {
        Some(429) => TrackerError::RateLimited { retry_after: None },
        Some(403) if rate_limited => TrackerError::RateLimited { retry_after: None },
        Some(401) => TrackerError::Unauthenticated(message),
        Some(403) => TrackerError::PermissionDenied(message),
        Some(404) => TrackerError::NotFound(message),
        Some(409 | 422) => TrackerError::Rejected(message),
        Some(code) if code >= 500 => TrackerError::Transient(message),
        Some(_) => TrackerError::Protocol(message),
        None if rate_limited => TrackerError::RateLimited { retry_after: None },
        None if lowered.contains("timeout")
            || lowered.contains("timed out")
            || lowered.contains("error connecting")
            || lowered.contains("connection reset") =>
        {
            TrackerError::Transient(message)
        }
        None if lowered.contains("gh auth login") || lowered.contains("not logged") => {
            TrackerError::Unauthenticated(message)
        }
        None => TrackerError::Protocol(message),
    }
}
