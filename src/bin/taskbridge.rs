//! Integrates one completed task with the remote tracker.
//!
//! Usage:
//!
//! ```text
//! taskbridge <task-id> [--skip-pr] [--ci-mode] [--skip-auth]
//! ```
//!
//! The task definition is read from `.agent/tasks/<task-id>.yaml` and its
//! report, when present, from `.agent/reports/<task-id>.report.yaml`. On
//! completion the task's ledger entry is written to stdout as JSON:
//!
//! ```json
//! {
//!   "task": "T001",
//!   "status": "integrated",
//!   "stage": "ledger_updated",
//!   "branch": "feature/t001-add-user-authentication",
//!   "issue": { "number": 12, "url": "https://github.com/o/r/issues/12" },
//!   "pull_request": { "number": 13, "url": "https://github.com/o/r/pull/13" },
//!   "pr_skipped": false,
//!   "report_digest": "0a1b2c3d4e5f",
//!   "updated_at": "2026-10-16T10:00:00Z"
//! }
//! ```
//!
//! Exit codes: `0` integrated or skipped, `1` failed, `2` authentication
//! required, `3` cancelled. An interrupt stops the run at the next
//! checkpoint with the furthest confirmed state recorded.

use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use camino::Utf8PathBuf;
use clap::Parser;
use mockable::DefaultClock;
use taskbridge::{
    config::{ConfigError, IntegrationConfig},
    integration::{
        adapters::{
            codeowners,
            git::GitCli,
            github::{GhCli, GhProbe, GitHubTracker},
            yaml::{YamlLedger, YamlTaskSource},
        },
        domain::{
            AuthPolicy, ErrorKind, IntegrationDomainError, LedgerEntry, ProjectBoard,
            RepositoryFullName, TaskKey,
        },
        ports::VcsError,
        services::{ReconcileOutcome, Reconciler, ReconcilerPorts},
    },
    telemetry,
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Exit code for failures before reconciliation starts.
const EXIT_SETUP_FAILURE: u8 = 1;

#[derive(Debug, Parser)]
#[command(
    name = "taskbridge",
    version,
    about = "Idempotently integrate a completed task as an issue, branch and pull request"
)]
struct Cli {
    /// Task identifier, e.g. `T001`.
    task_id: String,

    /// Create the issue (and branch, when the report lists changes) but no
    /// pull request.
    #[arg(long)]
    skip_pr: bool,

    /// Fail fast when no credential is available.
    #[arg(long)]
    ci_mode: bool,

    /// Record the run locally without contacting the tracker.
    #[arg(long, conflicts_with = "ci_mode")]
    skip_auth: bool,

    /// Repository working tree.
    #[arg(long)]
    workdir: Option<Utf8PathBuf>,

    /// Repository as `owner/repo`; detected from the remote when omitted.
    #[arg(long)]
    repo: Option<String>,

    /// Project board number receiving the task issue.
    #[arg(long)]
    project: Option<u64>,

    /// Status set on the project item.
    #[arg(long, requires = "project")]
    project_status: Option<String>,
}

/// Errors that prevent a reconciliation from starting.
#[derive(Debug, Error)]
enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Domain(#[from] IntegrationDomainError),
    #[error("cannot detect the repository from the git remote: {0}")]
    Remote(#[from] VcsError),
    #[error("cannot read CODEOWNERS: {0}")]
    CodeOwners(#[source] io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    telemetry::init();
    let cli = Cli::parse();
    match run(cli).await {
        Ok((outcome, policy)) => {
            summarize(&outcome, policy);
            ExitCode::from(outcome.exit_code())
        }
        Err(err) => {
            error!(error = %err, "taskbridge could not start");
            ExitCode::from(EXIT_SETUP_FAILURE)
        }
    }
}

async fn run(cli: Cli) -> Result<(ReconcileOutcome, AuthPolicy), SetupError> {
    let config = configure(&cli)?;
    let key = TaskKey::new(cli.task_id)?;

    let ledger = YamlLedger::new(config.ledger_path());
    let git = GitCli::new(config.workdir(), config.remote())
        .with_timeout(config.remote_timeout())
        .with_excluded_paths(ledger.working_paths());
    let repository = repository(&config, &git).await?;
    let gh = GhCli::new(repository).with_timeout(config.remote_timeout());
    let owners = codeowners::discover(config.workdir()).map_err(SetupError::CodeOwners)?;

    let reconciler = Reconciler::new(
        ReconcilerPorts {
            tracker: Arc::new(GitHubTracker::new(gh.clone())),
            vcs: Arc::new(git),
            ledger: Arc::new(ledger),
            probe: Arc::new(GhProbe::new(gh, config.token().map(str::to_owned))),
            clock: Arc::new(DefaultClock),
        },
        config.retry(),
    )
    .with_code_owners(owners);
    let source = YamlTaskSource::new(config.tasks_dir(), config.reports_dir());
    let options = config.reconcile_options(cli.skip_pr);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; stopping at the next checkpoint");
            trigger.cancel();
        }
    });

    let outcome = reconciler
        .reconcile_by_id(&source, &key, &options, &cancel)
        .await;
    Ok((outcome, config.auth_policy()))
}

/// Layers command-line flags over the environment.
fn configure(cli: &Cli) -> Result<IntegrationConfig, SetupError> {
    let mut config = IntegrationConfig::from_env()?;
    if let Some(workdir) = cli.workdir.as_ref() {
        config = config.with_workdir(workdir.clone());
    }
    if let Some(repo) = cli.repo.as_ref() {
        config = config.with_repository(RepositoryFullName::new(repo.as_str())?);
    }
    if let Some(number) = cli.project {
        let mut board = ProjectBoard::new(number);
        board.status.clone_from(&cli.project_status);
        config = config.with_project_board(Some(board));
    }
    if cli.skip_auth {
        config = config.with_auth_policy(AuthPolicy::Skip);
    } else if cli.ci_mode {
        config = config.with_auth_policy(AuthPolicy::NonInteractive);
    }
    Ok(config)
}

async fn repository(
    config: &IntegrationConfig,
    git: &GitCli,
) -> Result<RepositoryFullName, SetupError> {
    if let Some(repository) = config.repository() {
        return Ok(repository.clone());
    }
    let url = git.remote_url().await?;
    Ok(RepositoryFullName::from_remote_url(&url)?)
}

fn summarize(outcome: &ReconcileOutcome, policy: AuthPolicy) {
    match outcome {
        ReconcileOutcome::Integrated(entry) => info!(task = %entry.task(), "integrated"),
        ReconcileOutcome::Skipped(entry) => {
            warn!(task = %entry.task(), "remote integration skipped; ledger left pending");
        }
        ReconcileOutcome::Failed { error, .. } => {
            error!(kind = %error.kind, stage = %error.stage, message = %error.message, "integration failed");
            if let (ErrorKind::AuthRequired, Some(hint)) = (error.kind, policy.login_hint()) {
                warn!(hint, "authentication required");
            }
        }
        ReconcileOutcome::Cancelled { stage, .. } => warn!(%stage, "integration cancelled"),
    }
    if let Some(entry) = outcome.entry() {
        if let Err(err) = write_entry(entry) {
            error!(error = %err, "cannot write the ledger entry to stdout");
        }
    }
}

fn write_entry(entry: &LedgerEntry) -> io::Result<()> {
    let mut out = io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, entry)?;
    writeln!(out)
}
