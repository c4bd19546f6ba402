//! Concurrent runs for one task serialise; runs for different tasks do not
//! interfere.

use std::sync::Arc;

use super::harness::{Harness, harness, report, task};
use rstest::rstest;
use taskbridge::integration::{
    domain::{LedgerStatus, TaskSpec},
    ports::LedgerStore,
    services::{ReconcileOptions, ReconcileOutcome},
};
use tokio_util::sync::CancellationToken;

async fn run_concurrently(
    harness: &Harness,
    runs: Vec<(TaskSpec, ReconcileOptions)>,
    changed: &[&str],
) -> Vec<ReconcileOutcome> {
    let task_report = Arc::new(report(changed));
    let handles: Vec<_> = runs
        .into_iter()
        .map(|(spec, options)| {
            let reconciler = Arc::clone(&harness.reconciler);
            let shared_report = Arc::clone(&task_report);
            tokio::spawn(async move {
                reconciler
                    .reconcile(
                        &spec,
                        Some(&shared_report),
                        &options,
                        &CancellationToken::new(),
                    )
                    .await
            })
        })
        .collect();
    let mut outcomes = Vec::with_capacity(handles.len());
    for handle in handles {
        outcomes.push(handle.await.expect("reconciliation task completes"));
    }
    outcomes
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn same_task_runs_produce_one_issue_and_one_pull_request(harness: Harness) {
    let spec = task("T400", "Add feature flags");
    let runs = (0..4)
        .map(|_| (spec.clone(), ReconcileOptions::default()))
        .collect();

    let outcomes = run_concurrently(&harness, runs, &["src/lib.rs"]).await;

    assert!(
        outcomes.iter().all(|outcome| outcome.exit_code() == 0),
        "a concurrent run failed: {outcomes:?}"
    );
    assert_eq!(harness.tracker.issues().len(), 1);
    assert_eq!(harness.tracker.pull_requests().len(), 1);
    assert_eq!(harness.repo.commit_messages().len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn different_tasks_are_all_recorded(harness: Harness) {
    let ids = ["T401", "T402", "T403", "T404"];
    let runs = ids
        .iter()
        .map(|id| {
            (
                task(id, &format!("Document module {id}")),
                ReconcileOptions::default().with_skip_pr(true),
            )
        })
        .collect();

    let outcomes = run_concurrently(&harness, runs, &[]).await;

    assert!(
        outcomes.iter().all(|outcome| outcome.exit_code() == 0),
        "a concurrent run failed: {outcomes:?}"
    );
    assert_eq!(harness.tracker.issues().len(), ids.len());
    let entries = harness.ledger.list().await.expect("ledger readable");
    assert_eq!(entries.len(), ids.len());
    assert!(
        entries
            .iter()
            .all(|entry| entry.status() == LedgerStatus::Integrated && entry.pr_skipped())
    );
}
