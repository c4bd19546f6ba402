//! Shared harness for in-memory reconciliation tests.

use std::sync::Arc;
use std::time::Duration;

use mockable::DefaultClock;
use rstest::fixture;
use taskbridge::integration::{
    adapters::memory::{InMemoryLedger, InMemoryRepository, InMemoryTracker, StaticProbe},
    domain::{
        ArtifactChange, CriterionResult, LedgerEntry, Report, TaskKey, TaskSpec, Verification,
    },
    ports::LedgerStore,
    services::{ReconcileOptions, ReconcileOutcome, Reconciler, ReconcilerPorts, RetryPolicy},
};
use tokio_util::sync::CancellationToken;

/// Reconciler wired to in-memory adapters.
pub type MemoryReconciler =
    Reconciler<InMemoryTracker, InMemoryRepository, InMemoryLedger, StaticProbe, DefaultClock>;

/// Retry policy fast enough for tests, with the production attempt budget.
pub const fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(1))
}

/// Builds the task `id` titled `title` with two acceptance criteria.
pub fn task(id: &str, title: &str) -> TaskSpec {
    TaskSpec::new(TaskKey::new(id).expect("valid task key"), title)
        .expect("valid task")
        .with_goal(format!("Deliver {title}"))
        .with_acceptance_criteria(["Behaviour is covered".to_owned(), "Docs updated".to_owned()])
}

/// Builds a passing report that modified `paths`.
pub fn report(paths: &[&str]) -> Report {
    Report {
        status: "completed".to_owned(),
        summary: vec!["Implemented the change".to_owned()],
        criteria_results: vec![CriterionResult {
            criterion: "Behaviour is covered".to_owned(),
            passed: true,
            evidence: None,
        }],
        files_modified: paths
            .iter()
            .map(|path| ArtifactChange {
                path: (*path).to_owned(),
                description: "updated".to_owned(),
            })
            .collect(),
        verification: Verification {
            commands_run: vec!["make test".to_owned()],
            results: vec!["all green".to_owned()],
        },
        risks: Vec::new(),
        next_steps: Vec::new(),
    }
}

/// In-memory adapters plus a reconciler over them.
pub struct Harness {
    pub tracker: InMemoryTracker,
    pub repo: InMemoryRepository,
    pub ledger: Arc<InMemoryLedger>,
    pub probe: Arc<StaticProbe>,
    pub reconciler: Arc<MemoryReconciler>,
}

impl Harness {
    /// Builds a harness around `tracker` with an authenticated probe and a
    /// working tree holding an uncommitted `src/lib.rs`.
    pub fn with_tracker(tracker: InMemoryTracker) -> Self {
        Self::build(tracker, StaticProbe::authenticated())
    }

    /// Builds a harness whose probe reports `probe`.
    pub fn with_probe(probe: StaticProbe) -> Self {
        Self::build(InMemoryTracker::new(), probe)
    }

    fn build(tracker: InMemoryTracker, probe: StaticProbe) -> Self {
        let repo = InMemoryRepository::new("main");
        repo.write_file("src/lib.rs");
        let ledger = Arc::new(InMemoryLedger::new());
        let probe_handle = Arc::new(probe);
        let reconciler = wire(&tracker, &repo, &ledger, &probe_handle);
        Self {
            tracker,
            repo,
            ledger,
            probe: probe_handle,
            reconciler: Arc::new(reconciler),
        }
    }

    /// Builds a second reconciler sharing this harness's repository, ledger
    /// and probe but calling `tracker`.
    pub fn reconciler_with_tracker(&self, tracker: &InMemoryTracker) -> MemoryReconciler {
        wire(tracker, &self.repo, &self.ledger, &self.probe)
    }

    /// Reconciles `task` with `report` and default options.
    pub async fn run(&self, task: &TaskSpec, report: &Report) -> ReconcileOutcome {
        self.run_with(task, report, &ReconcileOptions::default())
            .await
    }

    /// Reconciles `task` with `report` and `options`.
    pub async fn run_with(
        &self,
        task: &TaskSpec,
        report: &Report,
        options: &ReconcileOptions,
    ) -> ReconcileOutcome {
        self.reconciler
            .reconcile(task, Some(report), options, &CancellationToken::new())
            .await
    }

    /// Reads the stored ledger entry for `id`.
    pub async fn stored(&self, id: &str) -> Option<LedgerEntry> {
        let key = TaskKey::new(id).expect("valid task key");
        self.ledger.get(&key).await.expect("ledger readable")
    }
}

fn wire(
    tracker: &InMemoryTracker,
    repo: &InMemoryRepository,
    ledger: &Arc<InMemoryLedger>,
    probe: &Arc<StaticProbe>,
) -> MemoryReconciler {
    Reconciler::new(
        ReconcilerPorts {
            tracker: Arc::new(tracker.clone()),
            vcs: Arc::new(repo.clone()),
            ledger: Arc::clone(ledger),
            probe: Arc::clone(probe),
            clock: Arc::new(DefaultClock),
        },
        fast_retry(),
    )
}

/// Provides a harness with default adapters.
#[fixture]
pub fn harness() -> Harness {
    Harness::with_tracker(InMemoryTracker::new())
}
