//! Cancellation interrupts in-flight remote calls and leaves a resumable
//! ledger entry.

use std::time::Duration;

use super::harness::{Harness, harness, report, task};
use rstest::rstest;
use taskbridge::integration::{
    adapters::memory::InMemoryTracker,
    domain::{ErrorKind, LedgerStatus, ReconcileStage},
    services::{ReconcileOptions, ReconcileOutcome},
};
use tokio_util::sync::CancellationToken;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn cancellation_during_a_slow_call_is_recorded_and_resumable() {
    let harness =
        Harness::with_tracker(InMemoryTracker::new().with_latency(Duration::from_millis(100)));
    let spec = task("T600", "Add batch export");
    let task_report = report(&["src/lib.rs"]);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        trigger.cancel();
    });

    let outcome = harness
        .reconciler
        .reconcile(
            &spec,
            Some(&task_report),
            &ReconcileOptions::default(),
            &cancel,
        )
        .await;

    assert_eq!(outcome.exit_code(), 3);
    assert!(matches!(
        outcome,
        ReconcileOutcome::Cancelled {
            entry: Some(_),
            stage: ReconcileStage::AuthChecked,
        }
    ));
    let stored = harness.stored("T600").await.expect("partial state recorded");
    assert_eq!(stored.status(), LedgerStatus::Pending);
    assert_eq!(
        stored.error().map(|recorded| recorded.kind),
        Some(ErrorKind::Cancelled)
    );

    let resumed = harness.run(&spec, &task_report).await;

    assert_eq!(resumed.exit_code(), 0, "resume failed: {resumed:?}");
    assert_eq!(harness.tracker.issues().len(), 1);
    assert_eq!(harness.tracker.pull_requests().len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn cancelled_rerun_keeps_integrated_entry_without_error(harness: Harness) {
    let spec = task("T601", "Add batch import");
    let task_report = report(&["src/lib.rs"]);
    let first = harness.run(&spec, &task_report).await;
    assert_eq!(first.exit_code(), 0, "first run failed: {first:?}");
    let slow = harness.reconciler_with_tracker(
        &harness.tracker.clone().with_latency(Duration::from_millis(100)),
    );
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        trigger.cancel();
    });

    let rerun = slow
        .reconcile(
            &spec,
            Some(&task_report),
            &ReconcileOptions::default(),
            &cancel,
        )
        .await;

    assert_eq!(rerun.exit_code(), 3);
    let stored = harness.stored("T601").await.expect("entry kept");
    assert_eq!(stored.status(), LedgerStatus::Integrated);
    assert!(stored.error().is_none());
}
