//! Shared world state for reconciliation BDD scenarios.

use std::sync::Arc;
use std::time::Duration;

use mockable::DefaultClock;
use rstest::fixture;
use taskbridge::integration::{
    adapters::memory::{InMemoryLedger, InMemoryRepository, InMemoryTracker, StaticProbe},
    domain::{Report, TaskSpec},
    services::{ReconcileOptions, ReconcileOutcome, Reconciler, ReconcilerPorts, RetryPolicy},
};

/// Reconciler type used by the BDD world.
pub type WorldReconciler =
    Reconciler<InMemoryTracker, InMemoryRepository, InMemoryLedger, StaticProbe, DefaultClock>;

/// Scenario world for reconciliation behaviour tests.
pub struct ReconcileWorld {
    pub tracker: InMemoryTracker,
    pub repo: InMemoryRepository,
    pub ledger: Arc<InMemoryLedger>,
    pub authenticated: bool,
    pub task: Option<TaskSpec>,
    pub report: Option<Report>,
    pub options: ReconcileOptions,
    pub outcome: Option<ReconcileOutcome>,
}

impl ReconcileWorld {
    /// Creates a world with empty adapters and an authenticated user.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tracker: InMemoryTracker::new(),
            repo: InMemoryRepository::new("main"),
            ledger: Arc::new(InMemoryLedger::new()),
            authenticated: true,
            task: None,
            report: None,
            options: ReconcileOptions::default(),
            outcome: None,
        }
    }

    /// Builds a reconciler over the world's adapters.
    pub fn reconciler(&self) -> WorldReconciler {
        let probe = if self.authenticated {
            StaticProbe::authenticated()
        } else {
            StaticProbe::unauthenticated()
        };
        Reconciler::new(
            ReconcilerPorts {
                tracker: Arc::new(self.tracker.clone()),
                vcs: Arc::new(self.repo.clone()),
                ledger: Arc::clone(&self.ledger),
                probe: Arc::new(probe),
                clock: Arc::new(DefaultClock),
            },
            RetryPolicy::new(3, Duration::from_millis(1)),
        )
    }

    /// Returns the outcome of the last run.
    pub fn outcome(&self) -> Result<&ReconcileOutcome, eyre::Report> {
        self.outcome
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing reconcile outcome in scenario world"))
    }
}

impl Default for ReconcileWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> ReconcileWorld {
    ReconcileWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
