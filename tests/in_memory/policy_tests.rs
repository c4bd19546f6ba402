//! Auth policies, issue-only integration and task loading.

use super::harness::{Harness, harness, report, task};
use rstest::rstest;
use taskbridge::integration::{
    adapters::memory::{InMemoryTaskSource, StaticProbe},
    domain::{AuthPolicy, ErrorKind, LedgerStatus, ProjectBoard, TaskKey},
    services::{ReconcileOptions, ReconcileOutcome},
};
use tokio_util::sync::CancellationToken;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn skip_policy_records_attempt_without_remote_calls(harness: Harness) {
    let spec = task("T700", "Add export format");
    let options = ReconcileOptions::default().with_auth_policy(AuthPolicy::Skip);

    let outcome = harness
        .run_with(&spec, &report(&["src/lib.rs"]), &options)
        .await;

    assert!(matches!(outcome, ReconcileOutcome::Skipped(_)));
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(harness.tracker.total_calls(), 0);
    assert_eq!(harness.probe.call_count(), 0);
    let stored = harness.stored("T700").await.expect("attempt recorded");
    assert_eq!(stored.status(), LedgerStatus::Pending);
    assert!(stored.issue().is_none());
}

#[rstest]
#[case::interactive(AuthPolicy::Interactive)]
#[case::non_interactive(AuthPolicy::NonInteractive)]
#[tokio::test(flavor = "multi_thread")]
async fn missing_credential_stops_before_remote_calls(#[case] policy: AuthPolicy) {
    let harness = Harness::with_probe(StaticProbe::unauthenticated());
    let spec = task("T701", "Add export format");
    let options = ReconcileOptions::default().with_auth_policy(policy);

    let outcome = harness
        .run_with(&spec, &report(&["src/lib.rs"]), &options)
        .await;

    assert_eq!(outcome.exit_code(), 2);
    assert_eq!(outcome.error_kind(), Some(ErrorKind::AuthRequired));
    assert_eq!(harness.probe.call_count(), 1);
    assert_eq!(harness.tracker.total_calls(), 0);
    assert_eq!(harness.repo.push_count(), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn issue_only_mode_reaches_project_board(harness: Harness) {
    let spec = task("T702", "Write runbook");
    let board = ProjectBoard::new(3).with_owner("acme").with_status("In Review");
    let options = ReconcileOptions::default()
        .with_skip_pr(true)
        .with_project_board(Some(board));

    let outcome = harness.run_with(&spec, &report(&[]), &options).await;

    assert_eq!(outcome.exit_code(), 0, "run failed: {outcome:?}");
    let entry = outcome.entry().expect("entry recorded");
    assert!(entry.pr_skipped());
    let issue = entry.issue().cloned().expect("issue recorded");
    assert_eq!(harness.tracker.project_items(), [(3, issue)]);
    assert!(harness.tracker.pull_requests().is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn task_without_report_integrates_from_definition(harness: Harness) {
    let source = InMemoryTaskSource::new();
    source.insert_task(task("T703", "Tidy configuration loading"));
    let key = TaskKey::new("T703").expect("valid task key");

    let outcome = harness
        .reconciler
        .reconcile_by_id(
            &source,
            &key,
            &ReconcileOptions::default(),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(outcome.exit_code(), 0, "run failed: {outcome:?}");
    let entry = outcome.entry().expect("entry recorded");
    assert!(entry.report_digest().is_none());
    assert_eq!(harness.tracker.pull_requests().len(), 1);
    assert_eq!(harness.repo.commit_messages().len(), 1);
}
