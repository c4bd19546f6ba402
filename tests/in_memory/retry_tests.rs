//! Transient tracker failures within and beyond the retry budget.

use std::time::{Duration, Instant};

use super::harness::{Harness, harness, report, task};
use rstest::rstest;
use taskbridge::integration::{
    adapters::memory::TrackerOperation, domain::ErrorKind, ports::TrackerError,
};

fn transient(count: usize) -> Vec<TrackerError> {
    (0..count)
        .map(|attempt| TrackerError::Transient(format!("502 on attempt {attempt}")))
        .collect()
}

#[rstest]
#[case::issue_search(TrackerOperation::SearchIssues)]
#[case::issue_creation(TrackerOperation::CreateIssue)]
#[case::pull_request_creation(TrackerOperation::CreatePullRequest)]
#[tokio::test(flavor = "multi_thread")]
async fn three_transient_failures_then_success_converges(
    harness: Harness,
    #[case] operation: TrackerOperation,
) {
    let spec = task("T300", "Add retry headers");
    harness.tracker.fail_next(operation, transient(3));

    let outcome = harness.run(&spec, &report(&["src/lib.rs"])).await;

    assert_eq!(outcome.exit_code(), 0, "run failed: {outcome:?}");
    assert_eq!(harness.tracker.issues().len(), 1);
    assert_eq!(harness.tracker.pull_requests().len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn four_transient_failures_exhaust_the_budget(harness: Harness) {
    let spec = task("T301", "Add retry headers");
    harness
        .tracker
        .fail_next(TrackerOperation::SearchIssues, transient(4));

    let outcome = harness.run(&spec, &report(&["src/lib.rs"])).await;

    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(outcome.error_kind(), Some(ErrorKind::RemoteTransient));
    assert_eq!(harness.tracker.call_count(TrackerOperation::SearchIssues), 4);
    assert_eq!(harness.tracker.call_count(TrackerOperation::CreateIssue), 0);
    let stored = harness.stored("T301").await.expect("failure recorded");
    assert_eq!(
        stored.error().map(|recorded| recorded.kind),
        Some(ErrorKind::RemoteTransient)
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn rate_limit_honours_advised_delay(harness: Harness) {
    let spec = task("T302", "Add retry headers");
    let advised = Duration::from_millis(40);
    harness.tracker.fail_next(
        TrackerOperation::SearchIssues,
        [TrackerError::RateLimited {
            retry_after: Some(advised),
        }],
    );
    let started = Instant::now();

    let outcome = harness.run(&spec, &report(&["src/lib.rs"])).await;

    assert_eq!(outcome.exit_code(), 0, "run failed: {outcome:?}");
    assert!(started.elapsed() >= advised);
}
