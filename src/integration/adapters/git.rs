//! Git adapter backed by the `git` command-line client.
//!
//! Every call is a subprocess in the working tree with terminal prompts
//! disabled, bounded by a timeout, and killed if the awaiting task is
//! dropped. Pushes never force.
//!
//! Paths are relative to the working directory, which must be the top level
//! of the repository.

use std::process::Output;
use std::time::Duration;

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use crate::integration::{
    domain::{BranchName, CommitMessage},
    ports::{BranchStart, VcsError, VcsResult, VersionControl},
};

/// Stderr fragments that identify a non-fast-forward rejection.
const REJECTION_MARKERS: [&str; 4] = [
    "[rejected]",
    "non-fast-forward",
    "fetch first",
    "Updates were rejected",
];

/// Stderr fragments that identify network failures worth retrying.
const TRANSIENT_MARKERS: [&str; 6] = [
    "Could not resolve host",
    "Connection timed out",
    "Connection reset",
    "The remote end hung up unexpectedly",
    "early EOF",
    "HTTP 5",
];

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
pub struct GitCli {
    workdir: Utf8PathBuf,
    remote: String,
    timeout: Duration,
    excluded: Vec<String>,
}

impl GitCli {
    /// Creates a client for `workdir` pushing to `remote`.
    #[must_use]
    pub fn new(workdir: impl Into<Utf8PathBuf>, remote: impl Into<String>) -> Self {
        Self {
            workdir: workdir.into(),
            remote: remote.into(),
            timeout: Duration::from_secs(60),
            excluded: Vec::new(),
        }
    }

    /// Never stages `paths`, which may be absolute or relative to the
    /// working directory and may contain pathspec wildcards.
    ///
    /// Paths outside the working directory cannot be staged anyway and are
    /// dropped.
    #[must_use]
    pub fn with_excluded_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Utf8Path>,
    {
        for entry in paths {
            let path = entry.as_ref();
            let relative = if path.is_absolute() {
                match path.strip_prefix(&self.workdir) {
                    Ok(inside) => inside,
                    Err(_) => {
                        debug!(%path, "ignoring exclusion outside the working tree");
                        continue;
                    }
                }
            } else {
                path
            };
            self.excluded.push(format!(":(exclude){relative}"));
        }
        self
    }

    /// Bounds every subprocess call by `timeout`.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the working directory.
    #[must_use]
    pub fn workdir(&self) -> &Utf8Path {
        &self.workdir
    }

    /// Returns the fetch URL of the configured remote.
    ///
    /// # Errors
    ///
    /// Returns [`VcsError::Command`] when the remote is not configured.
    pub async fn remote_url(&self) -> VcsResult<String> {
        let output = self
            .run_checked(&["remote", "get-url", self.remote.as_str()])
            .await?;
        Ok(stdout_of(&output))
    }

    async fn run(&self, args: &[&str]) -> VcsResult<Output> {
        let mut command = Command::new("git");
        command
            .args(args)
            .current_dir(&self.workdir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .kill_on_drop(true);
        debug!(args = %args.join(" "), "running git");
        tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| {
                VcsError::Transient(format!(
                    "git {} timed out after {}s",
                    args.join(" "),
                    self.timeout.as_secs()
                ))
            })?
            .map_err(VcsError::io)
    }

    async fn run_checked(&self, args: &[&str]) -> VcsResult<Output> {
        let output = self.run(args).await?;
        if output.status.success() {
            return Ok(output);
        }
        Err(classify_failure(args, &stderr_of(&output)))
    }

    /// Returns the exit status of a command used as a predicate.
    async fn probe(&self, args: &[&str]) -> VcsResult<bool> {
        let output = self.run(args).await?;
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1 | 2) => Ok(false),
            _ => Err(classify_failure(args, &stderr_of(&output))),
        }
    }

    /// Returns the entries of `paths` that `git status` still reports as
    /// changed, directly or through a file beneath them.
    async fn pending_paths<'a>(&self, paths: &'a [String]) -> VcsResult<Vec<&'a str>> {
        let mut args = vec!["status", "--porcelain", "-z", "--untracked-files=all", "--"];
        args.extend(paths.iter().map(String::as_str));
        args.extend(self.excluded.iter().map(String::as_str));
        let output = self.run_checked(&args).await?;
        let status = String::from_utf8_lossy(&output.stdout);
        let changed = changed_entries(&status);
        Ok(paths
            .iter()
            .map(|path| path.trim_start_matches("./").trim_end_matches('/'))
            .filter(|path| changed.iter().any(|entry| covers(path, entry)))
            .collect())
    }

    async fn fetch(&self, branch: &str) -> VcsResult<()> {
        self.run_checked(&["fetch", self.remote.as_str(), branch])
            .await
            .map(|_| ())
    }
}

fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_owned()
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_owned()
}

/// Parses `git status --porcelain -z` output into the paths it names,
/// including the origin of renames and copies.
fn changed_entries(status: &str) -> Vec<&str> {
    let mut entries = Vec::new();
    let mut records = status.split('\0').filter(|record| !record.is_empty());
    while let Some(record) = records.next() {
        let Some((code, path)) = record.split_at_checked(3) else {
            continue;
        };
        entries.push(path);
        if code.contains(['R', 'C']) {
            entries.extend(records.next());
        }
    }
    entries
}

fn covers(requested: &str, entry: &str) -> bool {
    requested.is_empty()
        || requested == "."
        || entry
            .strip_prefix(requested)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

fn classify_failure(args: &[&str], stderr: &str) -> VcsError {
    if TRANSIENT_MARKERS.iter().any(|marker| stderr.contains(marker)) {
        return VcsError::Transient(stderr.to_owned());
    }
    VcsError::Command {
        command: format!("git {}", args.join(" ")),
        stderr: stderr.to_owned(),
    }
}

#[async_trait]
impl VersionControl for GitCli {
    async fn local_branch_exists(&self, branch: &BranchName) -> VcsResult<bool> {
        let reference = format!("refs/heads/{branch}");
        self.probe(&["show-ref", "--verify", "--quiet", &reference])
            .await
    }

    async fn remote_branch_exists(&self, branch: &BranchName) -> VcsResult<bool> {
        self.probe(&[
            "ls-remote",
            "--exit-code",
            "--heads",
            self.remote.as_str(),
            branch.as_str(),
        ])
        .await
    }

    #[instrument(skip_all, fields(branch = %branch))]
    async fn checkout(&self, branch: &BranchName, start: BranchStart) -> VcsResult<()> {
        match start {
            BranchStart::Existing => {
                self.run_checked(&["checkout", branch.as_str()]).await?;
            }
            BranchStart::TrackRemote => {
                self.fetch(branch.as_str()).await?;
                let upstream = format!("{}/{branch}", self.remote);
                self.run_checked(&["checkout", "-b", branch.as_str(), "--track", &upstream])
                    .await?;
            }
            BranchStart::NewFromHead => {
                self.run_checked(&["checkout", "-b", branch.as_str()]).await?;
            }
        }
        debug!(?start, "checked out task branch");
        Ok(())
    }

    async fn stage(&self, paths: &[String]) -> VcsResult<()> {
        let mut args = vec!["add", "-A", "--"];
        if paths.is_empty() {
            args.push(".");
        } else {
            let pending = self.pending_paths(paths).await?;
            if pending.is_empty() {
                debug!(requested = paths.len(), "nothing left to stage");
                return Ok(());
            }
            args.extend(pending);
        }
        args.extend(self.excluded.iter().map(String::as_str));
        self.run_checked(&args).await.map(|_| ())
    }

    async fn has_staged_changes(&self) -> VcsResult<bool> {
        let unchanged = self.probe(&["diff", "--cached", "--quiet"]).await?;
        Ok(!unchanged)
    }

    #[instrument(skip_all, fields(header = message.header()))]
    async fn commit(&self, message: &CommitMessage) -> VcsResult<String> {
        let text = message.to_string();
        self.run_checked(&["commit", "-m", &text]).await?;
        self.head_commit().await
    }

    async fn head_commit(&self) -> VcsResult<String> {
        let output = self.run_checked(&["rev-parse", "HEAD"]).await?;
        Ok(stdout_of(&output))
    }

    async fn commits_ahead(&self, base: &str) -> VcsResult<u64> {
        let remote_base = format!("{}/{base}", self.remote);
        let range = match self.fetch(base).await {
            Ok(()) => format!("{remote_base}..HEAD"),
            Err(err) if err.is_retryable() => return Err(err),
            Err(err) => {
                warn!(error = %err, base, "remote base unavailable, counting against local base");
                format!("{base}..HEAD")
            }
        };
        let output = self.run_checked(&["rev-list", "--count", &range]).await?;
        let count = stdout_of(&output);
        count.parse::<u64>().map_err(|err| VcsError::Command {
            command: format!("git rev-list --count {range}"),
            stderr: format!("unexpected count {count:?}: {err}"),
        })
    }

    #[instrument(skip_all, fields(branch = %branch))]
    async fn push(&self, branch: &BranchName) -> VcsResult<()> {
        let args = ["push", "-u", self.remote.as_str(), branch.as_str()];
        let output = self.run(&args).await?;
        if output.status.success() {
            debug!("pushed task branch");
            return Ok(());
        }
        let stderr = stderr_of(&output);
        if REJECTION_MARKERS.iter().any(|marker| stderr.contains(marker)) {
            warn!("push rejected as non-fast-forward");
            return Err(VcsError::PushRejected(branch.to_string()));
        }
        Err(classify_failure(&args, &stderr))
    }

    #[instrument(skip_all, fields(branch = %branch))]
    async fn rebase_onto_remote(&self, branch: &BranchName) -> VcsResult<()> {
        let args = ["pull", "--rebase", self.remote.as_str(), branch.as_str()];
        let output = self.run(&args).await?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = stderr_of(&output);
        let failure = classify_failure(&args, &stderr);
        if failure.is_retryable() {
            return Err(failure);
        }
        if let Err(abort) = self.run_checked(&["rebase", "--abort"]).await {
            debug!(error = %abort, "no rebase in progress to abort");
        }
        Err(VcsError::RebaseConflict(branch.to_string()))
    }
}
