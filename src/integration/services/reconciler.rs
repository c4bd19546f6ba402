//! Reconciliation of one task against remote tracker state.

use std::sync::Arc;

use mockable::Clock;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::error::{ReconcileError, ReconcileResult};
use super::materializer::BranchMaterializer;
use super::render;
use super::resolver::RemoteStateResolver;
use super::retry::RetryPolicy;
use crate::integration::{
    domain::{
        AuthPolicy, BranchName, CodeOwners, ErrorKind, IssueDraft, IssueRef, LedgerEntry, LedgerStatus,
        ProjectBoard, PullRequestDraft, RecordedError, ReconcileStage, Report, TaskKey, TaskSpec,
    },
    ports::{CapabilityProbe, IssueTracker, LedgerStore, TaskSource, VersionControl},
};

/// Branch used as the pull request base when the tracker cannot name one.
pub const DEFAULT_BASE_BRANCH: &str = "main";

/// Caller-selected behaviour for one reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOptions {
    skip_pr: bool,
    project_board: Option<ProjectBoard>,
    auth_policy: AuthPolicy,
    fallback_base_branch: String,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            skip_pr: false,
            project_board: None,
            auth_policy: AuthPolicy::default(),
            fallback_base_branch: DEFAULT_BASE_BRANCH.to_owned(),
        }
    }
}

impl ReconcileOptions {
    /// Stops after the issue, or after the branch when the report lists
    /// changes, and integrates without a pull request.
    #[must_use]
    pub const fn with_skip_pr(mut self, skip_pr: bool) -> Self {
        self.skip_pr = skip_pr;
        self
    }

    /// Adds the task issue to `board` before the ledger is finalised.
    #[must_use]
    pub fn with_project_board(mut self, board: Option<ProjectBoard>) -> Self {
        self.project_board = board;
        self
    }

    /// Selects the reaction to a missing credential.
    #[must_use]
    pub const fn with_auth_policy(mut self, policy: AuthPolicy) -> Self {
        self.auth_policy = policy;
        self
    }

    /// Sets the base branch used when the tracker cannot report one.
    #[must_use]
    pub fn with_fallback_base_branch(mut self, branch: impl Into<String>) -> Self {
        self.fallback_base_branch = branch.into();
        self
    }

    /// Returns `true` in issue-only mode.
    #[must_use]
    pub const fn skip_pr(&self) -> bool {
        self.skip_pr
    }

    /// Returns the configured project board.
    #[must_use]
    pub const fn project_board(&self) -> Option<&ProjectBoard> {
        self.project_board.as_ref()
    }

    /// Returns the auth policy.
    #[must_use]
    pub const fn auth_policy(&self) -> AuthPolicy {
        self.auth_policy
    }

    /// Returns the base branch used when the tracker cannot report one.
    #[must_use]
    pub fn fallback_base_branch(&self) -> &str {
        &self.fallback_base_branch
    }
}

/// Terminal result of one reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Every required remote object is confirmed and recorded.
    Integrated(LedgerEntry),
    /// Remote work was skipped by policy; the ledger records the attempt.
    Skipped(LedgerEntry),
    /// A non-retryable error ended the run.
    Failed {
        /// Entry as stored, when the failure could be recorded.
        entry: Option<LedgerEntry>,
        /// Classification, stage and message of the failure.
        error: RecordedError,
    },
    /// Cancellation was observed.
    Cancelled {
        /// Entry as stored, when the partial state could be recorded.
        entry: Option<LedgerEntry>,
        /// Furthest stage reached.
        stage: ReconcileStage,
    },
}

impl ReconcileOutcome {
    /// Returns the process exit code: `0` integrated or skipped, `1` failed,
    /// `2` authentication required, `3` cancelled.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Integrated(_) | Self::Skipped(_) => 0,
            Self::Failed { error, .. } if matches!(error.kind, ErrorKind::AuthRequired) => 2,
            Self::Failed { .. } => 1,
            Self::Cancelled { .. } => 3,
        }
    }

    /// Returns the ledger entry as stored by this run.
    #[must_use]
    pub const fn entry(&self) -> Option<&LedgerEntry> {
        match self {
            Self::Integrated(entry) | Self::Skipped(entry) => Some(entry),
            Self::Failed { entry, .. } | Self::Cancelled { entry, .. } => entry.as_ref(),
        }
    }

    /// Returns the failure classification, if the run did not succeed.
    #[must_use]
    pub const fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Integrated(_) | Self::Skipped(_) => None,
            Self::Failed { error, .. } => Some(error.kind),
            Self::Cancelled { .. } => Some(ErrorKind::Cancelled),
        }
    }
}

/// Ports the reconciler drives.
pub struct ReconcilerPorts<T, V, L, P, C> {
    /// Remote issue tracker.
    pub tracker: Arc<T>,
    /// Local checkout.
    pub vcs: Arc<V>,
    /// Durable ledger.
    pub ledger: Arc<L>,
    /// Credential probe.
    pub probe: Arc<P>,
    /// Time source for ledger timestamps.
    pub clock: Arc<C>,
}

/// Drives one task through
/// `INIT -> AUTH_CHECKED -> ISSUE_RESOLVED -> BRANCH_READY -> PR_RESOLVED -> LEDGER_UPDATED`.
///
/// The per-task ledger lease is held for the whole run, so concurrent runs
/// for one task serialise while runs for different tasks proceed in
/// parallel. Progress is checkpointed to the ledger after every stage.
pub struct Reconciler<T, V, L, P, C>
where
    T: IssueTracker,
    V: VersionControl,
    L: LedgerStore,
    P: CapabilityProbe,
    C: Clock + Send + Sync,
{
    resolver: RemoteStateResolver<T>,
    materializer: BranchMaterializer<V>,
    ledger: Arc<L>,
    probe: Arc<P>,
    clock: Arc<C>,
    code_owners: CodeOwners,
}

/// Mutable state of one run.
struct Run {
    entry: LedgerEntry,
    stage: ReconcileStage,
    login: Option<String>,
}

/// How a run that did not fail ended.
enum Completion {
    Integrated(LedgerEntry),
    Skipped(LedgerEntry),
}

impl<T, V, L, P, C> Reconciler<T, V, L, P, C>
where
    T: IssueTracker,
    V: VersionControl,
    L: LedgerStore,
    P: CapabilityProbe,
    C: Clock + Send + Sync,
{
    /// Creates a reconciler.
    #[must_use]
    pub fn new(ports: ReconcilerPorts<T, V, L, P, C>, retry: RetryPolicy) -> Self {
        Self {
            resolver: RemoteStateResolver::new(ports.tracker, retry),
            materializer: BranchMaterializer::new(ports.vcs, retry),
            ledger: ports.ledger,
            probe: ports.probe,
            clock: ports.clock,
            code_owners: CodeOwners::default(),
        }
    }

    /// Requests reviews from the owners of the task's modified paths.
    #[must_use]
    pub fn with_code_owners(mut self, code_owners: CodeOwners) -> Self {
        self.code_owners = code_owners;
        self
    }

    /// Loads the task and its report from `source` and reconciles it.
    ///
    /// A missing report is tolerated; integration proceeds from the task
    /// alone.
    pub async fn reconcile_by_id<S>(
        &self,
        source: &S,
        key: &TaskKey,
        options: &ReconcileOptions,
        cancel: &CancellationToken,
    ) -> ReconcileOutcome
    where
        S: TaskSource,
    {
        let loaded = async {
            let task = source.load_task(key).await?;
            let report = source.load_report(key).await?;
            Ok::<_, ReconcileError>((task, report))
        }
        .await;
        let (task, report) = match loaded {
            Ok(pair) => pair,
            Err(err) => {
                error!(task = %key, error = %err, "cannot load task records");
                return ReconcileOutcome::Failed {
                    entry: None,
                    error: RecordedError {
                        kind: err.kind(),
                        stage: ReconcileStage::Init,
                        message: err.to_string(),
                    },
                };
            }
        };
        if report.is_none() {
            warn!(task = %key, "no report found; integrating from the task definition alone");
        }
        self.reconcile(&task, report.as_ref(), options, cancel).await
    }

    /// Reconciles `task` and records the outcome in the ledger.
    ///
    /// Every error is folded into the returned outcome and, when the ledger
    /// is reachable, recorded against the furthest stage reached.
    #[instrument(skip_all, fields(task = %task.key(), run_id = %Uuid::new_v4()))]
    pub async fn reconcile(
        &self,
        task: &TaskSpec,
        report: Option<&Report>,
        options: &ReconcileOptions,
        cancel: &CancellationToken,
    ) -> ReconcileOutcome {
        let key = task.key();
        let lease = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                return ReconcileOutcome::Cancelled { entry: None, stage: ReconcileStage::Init };
            }
            lease = self.ledger.lock(key) => lease,
        };
        let _lease = match lease {
            Ok(lease) => lease,
            Err(err) => return unrecorded_failure(&ReconcileError::from(err), ReconcileStage::Init),
        };
        let stored = match self.ledger.get(key).await {
            Ok(stored) => stored,
            Err(err) => return unrecorded_failure(&ReconcileError::from(err), ReconcileStage::Init),
        };
        info!(
            previous = stored.as_ref().map(|entry| entry.status().as_str()),
            "reconciliation started"
        );

        let clock = &*self.clock;
        let mut run = Run {
            entry: stored.unwrap_or_else(|| LedgerEntry::new(key.clone(), clock)),
            stage: ReconcileStage::Init,
            login: None,
        };
        run.entry.record_report_digest(report.map(Report::digest), clock);

        match self.drive(&mut run, task, report, options, cancel).await {
            Ok(Completion::Integrated(entry)) => {
                info!(
                    issue = entry.issue().map(|issue| issue.number.value()),
                    pull_request = entry.pull_request().map(|pr| pr.number.value()),
                    "task integrated"
                );
                ReconcileOutcome::Integrated(entry)
            }
            Ok(Completion::Skipped(entry)) => ReconcileOutcome::Skipped(entry),
            Err(err) => self.record_failure(run, &err).await,
        }
    }

    async fn drive(
        &self,
        run: &mut Run,
        task: &TaskSpec,
        report: Option<&Report>,
        options: &ReconcileOptions,
        cancel: &CancellationToken,
    ) -> ReconcileResult<Completion> {
        if options.auth_policy == AuthPolicy::Skip {
            info!("auth policy is skip; no remote calls will be made");
            run.entry.mark_pending(None, &*self.clock);
            let stored = self.ledger.put(run.entry.clone()).await?;
            return Ok(Completion::Skipped(stored));
        }
        self.check_auth(run, cancel).await?;

        let issue = self.resolve_issue(run, task, report, cancel).await?;

        let has_changes = report.is_some_and(Report::has_changes);
        if options.skip_pr && !has_changes {
            info!("issue-only integration without changes");
            return self.finish(run, &issue, options, true, cancel).await;
        }

        let branch = self
            .materializer
            .ensure_branch(task, report, Some(issue.number), cancel)
            .await?;
        run.entry.record_branch(branch.name().clone(), &*self.clock);
        self.checkpoint(run, ReconcileStage::BranchReady, cancel).await?;
        if options.skip_pr {
            return self.finish(run, &issue, options, true, cancel).await;
        }

        self.resolve_pull_request(run, task, report, &issue, options, cancel)
            .await?;
        self.finish(run, &issue, options, false, cancel).await
    }

    async fn check_auth(&self, run: &mut Run, cancel: &CancellationToken) -> ReconcileResult<()> {
        let auth = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ReconcileError::Cancelled),
            auth = self.probe.check_auth() => auth,
        };
        if !auth.ok {
            warn!(method = %auth.method, detail = %auth.detail, "no usable credential");
            return Err(ReconcileError::AuthRequired(auth.detail));
        }
        info!(method = %auth.method, "credential confirmed");
        run.login = auth.login;
        run.stage.advance(ReconcileStage::AuthChecked)?;
        Ok(())
    }

    async fn resolve_issue(
        &self,
        run: &mut Run,
        task: &TaskSpec,
        report: Option<&Report>,
        cancel: &CancellationToken,
    ) -> ReconcileResult<IssueRef> {
        let body = render::issue_body(task, report)?;
        let draft = IssueDraft::for_task(task.key(), task.title(), body);
        let known = run.entry.issue().cloned();
        let resolved = self
            .resolver
            .ensure_issue(task.key(), &draft, known.as_ref(), cancel)
            .await?;
        let issue = resolved.remote.to_ref();
        run.entry.record_issue(issue.clone(), &*self.clock);
        self.checkpoint(run, ReconcileStage::IssueResolved, cancel)
            .await?;
        Ok(issue)
    }

    async fn resolve_pull_request(
        &self,
        run: &mut Run,
        task: &TaskSpec,
        report: Option<&Report>,
        issue: &IssueRef,
        options: &ReconcileOptions,
        cancel: &CancellationToken,
    ) -> ReconcileResult<()> {
        let head = recorded_branch(&run.entry)?;
        let base = self
            .resolver
            .default_branch(&options.fallback_base_branch, cancel)
            .await?;
        if self
            .resolver
            .find_pull_request(task.key(), &head, cancel)
            .await?
            .is_none()
        {
            let ahead = self.materializer.commits_ahead(&base, cancel).await?;
            if ahead == 0 {
                return Err(ReconcileError::InvalidInput(format!(
                    "branch {head} has no commits ahead of {base}; nothing to propose"
                )));
            }
        }

        let paths = report.map(Report::changed_paths).unwrap_or_default();
        let reviewers = self
            .code_owners
            .reviewers_for(paths.iter().map(String::as_str), run.login.as_deref());
        let draft = PullRequestDraft {
            title: render::pull_request_title(task),
            body: render::pull_request_body(task, report, issue.number)?,
            head,
            base,
        };
        let resolved = self
            .resolver
            .ensure_pull_request(task.key(), &draft, &reviewers, cancel)
            .await?;
        run.entry
            .record_pull_request(resolved.remote.to_ref(), &*self.clock);
        run.stage.advance(ReconcileStage::PrResolved)?;
        Ok(())
    }

    async fn finish(
        &self,
        run: &mut Run,
        issue: &IssueRef,
        options: &ReconcileOptions,
        pr_skipped: bool,
        cancel: &CancellationToken,
    ) -> ReconcileResult<Completion> {
        if let Some(board) = options.project_board.as_ref() {
            self.resolver.add_to_project(board, issue, cancel).await?;
        }
        if cancel.is_cancelled() {
            return Err(ReconcileError::Cancelled);
        }
        run.entry.mark_integrated(pr_skipped, &*self.clock)?;
        run.stage.advance(ReconcileStage::LedgerUpdated)?;
        let stored = self.ledger.put(run.entry.clone()).await?;
        Ok(Completion::Integrated(stored))
    }

    /// Advances the run and persists progress as a pending entry.
    ///
    /// An entry already integrated by an earlier run is left untouched
    /// until the final write.
    async fn checkpoint(
        &self,
        run: &mut Run,
        stage: ReconcileStage,
        cancel: &CancellationToken,
    ) -> ReconcileResult<()> {
        run.stage.advance(stage)?;
        if run.entry.status() != LedgerStatus::Integrated {
            run.entry.record_stage(stage, &*self.clock);
            run.entry.mark_pending(None, &*self.clock);
            run.entry = self.ledger.put(run.entry.clone()).await?;
        }
        info!(%stage, "stage reached");
        if cancel.is_cancelled() {
            return Err(ReconcileError::Cancelled);
        }
        Ok(())
    }

    async fn record_failure(&self, mut run: Run, err: &ReconcileError) -> ReconcileOutcome {
        let kind = err.kind();
        let recorded = RecordedError {
            kind,
            stage: run.stage,
            message: err.to_string(),
        };
        let clock = &*self.clock;
        if kind == ErrorKind::Cancelled {
            warn!(stage = %run.stage, "reconciliation cancelled");
            run.entry.mark_pending(Some(recorded.clone()), clock);
        } else {
            error!(stage = %run.stage, %kind, error = %err, "reconciliation failed");
            run.entry.mark_failed(recorded.clone(), clock);
        }
        let stored = match self.ledger.put(run.entry).await {
            Ok(stored) => Some(stored),
            Err(write_err) => {
                error!(error = %write_err, "could not record the outcome in the ledger");
                None
            }
        };
        if kind == ErrorKind::Cancelled {
            return ReconcileOutcome::Cancelled {
                entry: stored,
                stage: run.stage,
            };
        }
        ReconcileOutcome::Failed {
            entry: stored,
            error: recorded,
        }
    }
}

/// Returns the branch recorded by the materialization stage.
fn recorded_branch(entry: &LedgerEntry) -> ReconcileResult<BranchName> {
    entry.branch().cloned().ok_or_else(|| {
        ReconcileError::InvalidInput("pull request requested before the branch exists".to_owned())
    })
}

fn unrecorded_failure(err: &ReconcileError, stage: ReconcileStage) -> ReconcileOutcome {
    error!(error = %err, "reconciliation could not start");
    ReconcileOutcome::Failed {
        entry: None,
        error: RecordedError {
            kind: err.kind(),
            stage,
            message: err.to_string(),
        },
    }
}
