//! Failed runs are recorded against their stage and resumed by the next run.

use super::harness::{Harness, harness, report, task};
use rstest::rstest;
use taskbridge::integration::{
    adapters::memory::TrackerOperation,
    domain::{ErrorKind, LedgerStatus, ReconcileStage},
    ports::TrackerError,
};

#[rstest]
#[case::issue_search(
    TrackerOperation::SearchIssues,
    TrackerError::PermissionDenied("token lacks issues:read".to_owned()),
    ErrorKind::PermissionDenied,
    ReconcileStage::AuthChecked
)]
#[case::default_branch(
    TrackerOperation::DefaultBranch,
    TrackerError::PermissionDenied("repository hidden".to_owned()),
    ErrorKind::PermissionDenied,
    ReconcileStage::BranchReady
)]
#[case::pull_request_creation(
    TrackerOperation::CreatePullRequest,
    TrackerError::Rejected("validation failed".to_owned()),
    ErrorKind::RemoteProtocol,
    ReconcileStage::BranchReady
)]
#[tokio::test(flavor = "multi_thread")]
async fn failure_is_recorded_then_resumed(
    harness: Harness,
    #[case] operation: TrackerOperation,
    #[case] error: TrackerError,
    #[case] kind: ErrorKind,
    #[case] stage: ReconcileStage,
) {
    let spec = task("T200", "Add webhook signatures");
    let task_report = report(&["src/lib.rs"]);
    harness.tracker.fail_next(operation, [error]);

    let failed = harness.run(&spec, &task_report).await;

    assert_eq!(failed.exit_code(), 1);
    assert_eq!(failed.error_kind(), Some(kind));
    let stored = harness.stored("T200").await.expect("failure recorded");
    assert_eq!(stored.status(), LedgerStatus::Failed);
    let recorded = stored.error().expect("error recorded");
    assert_eq!(recorded.kind, kind);
    assert_eq!(recorded.stage, stage);

    let resumed = harness.run(&spec, &task_report).await;

    assert_eq!(resumed.exit_code(), 0, "resume failed: {resumed:?}");
    let entry = resumed.entry().expect("entry recorded");
    assert_eq!(entry.status(), LedgerStatus::Integrated);
    assert!(entry.error().is_none());
    assert_eq!(harness.tracker.issues().len(), 1);
    assert_eq!(harness.tracker.pull_requests().len(), 1);
    assert_eq!(harness.repo.commit_messages().len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn partial_progress_survives_a_failed_push(harness: Harness) {
    let spec = task("T201", "Add metrics endpoint");
    let task_report = report(&["src/lib.rs"]);
    harness.repo.fail_pushes(4);

    let failed = harness.run(&spec, &task_report).await;

    assert_eq!(failed.error_kind(), Some(ErrorKind::RemoteTransient));
    let stored = harness.stored("T201").await.expect("failure recorded");
    assert!(stored.issue().is_some());
    assert!(stored.branch().is_none());
    assert_eq!(
        stored.error().map(|recorded| recorded.stage),
        Some(ReconcileStage::IssueResolved)
    );

    let resumed = harness.run(&spec, &task_report).await;

    assert_eq!(resumed.exit_code(), 0, "resume failed: {resumed:?}");
    assert_eq!(harness.tracker.call_count(TrackerOperation::CreateIssue), 1);
    assert_eq!(harness.repo.commit_messages().len(), 1);
    assert_eq!(harness.repo.push_count(), 1);
}
