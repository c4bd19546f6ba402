//! Lost responses, naming conflicts and push conflicts.

use super::harness::{Harness, harness, report, task};
use rstest::rstest;
use taskbridge::integration::{
    adapters::memory::TrackerOperation,
    domain::{AGENT_TASK_LABEL, ErrorKind, IssueState, LedgerStatus, PullRequestState},
    ports::TrackerError,
};

#[rstest]
#[case::issue(TrackerOperation::CreateIssue)]
#[case::pull_request(TrackerOperation::CreatePullRequest)]
#[tokio::test(flavor = "multi_thread")]
async fn lost_create_response_does_not_duplicate(
    harness: Harness,
    #[case] operation: TrackerOperation,
) {
    let spec = task("T500", "Add export format");
    harness.tracker.lose_next_response(
        operation,
        TrackerError::Transient("connection reset after write".to_owned()),
    );

    let outcome = harness.run(&spec, &report(&["src/lib.rs"])).await;

    assert_eq!(outcome.exit_code(), 0, "run failed: {outcome:?}");
    assert_eq!(harness.tracker.call_count(operation), 1);
    assert_eq!(harness.tracker.issues().len(), 1);
    assert_eq!(harness.tracker.pull_requests().len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn foreign_issue_with_task_prefix_is_a_naming_conflict(harness: Harness) {
    let spec = task("T501", "Add export format");
    harness
        .tracker
        .seed_issue("[T501] Someone else's idea", &[], IssueState::Open)
        .expect("seed issue");

    let outcome = harness.run(&spec, &report(&["src/lib.rs"])).await;

    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(outcome.error_kind(), Some(ErrorKind::NamingConflict));
    assert_eq!(harness.tracker.call_count(TrackerOperation::CreateIssue), 0);
    assert_eq!(harness.repo.push_count(), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn longer_task_identifier_is_not_mistaken_for_the_task(harness: Harness) {
    let spec = task("T502", "Add export format");
    harness
        .tracker
        .seed_issue("[T5021] Unrelated work", &[AGENT_TASK_LABEL], IssueState::Open)
        .expect("seed issue");

    let outcome = harness.run(&spec, &report(&["src/lib.rs"])).await;

    assert_eq!(outcome.exit_code(), 0, "run failed: {outcome:?}");
    assert_eq!(harness.tracker.issues().len(), 2);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn closed_unmerged_pull_request_is_a_naming_conflict(harness: Harness) {
    let spec = task("T503", "Add sso");
    harness
        .tracker
        .seed_pull_request(
            "[T503] Add sso",
            "feature/t503-add-sso",
            PullRequestState::Closed,
        )
        .expect("seed pull request");

    let outcome = harness.run(&spec, &report(&["src/lib.rs"])).await;

    assert_eq!(outcome.error_kind(), Some(ErrorKind::NamingConflict));
    assert_eq!(harness.tracker.pull_requests().len(), 1);
    let stored = harness.stored("T503").await.expect("failure recorded");
    assert!(stored.issue().is_some());
    assert!(stored.branch().is_some());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn conflicting_remote_history_is_a_push_conflict(harness: Harness) {
    let spec = task("T504", "Add sso");
    let task_report = report(&["src/lib.rs"]);
    let first = harness.run(&spec, &task_report).await;
    assert_eq!(first.exit_code(), 0, "first run failed: {first:?}");
    harness.repo.push_foreign_commit("feature/t504-add-sso");
    harness.repo.conflict_on_rebase();
    harness.repo.write_file("src/lib.rs");

    let second = harness.run(&spec, &task_report).await;

    assert_eq!(second.exit_code(), 1);
    assert_eq!(second.error_kind(), Some(ErrorKind::PushConflict));
    let stored = harness.stored("T504").await.expect("failure recorded");
    assert_eq!(stored.status(), LedgerStatus::Failed);
    assert!(stored.issue().is_some());
    assert!(stored.pull_request().is_some());
}
