//! Repeated reconciliation converges on one set of remote objects.

use super::harness::{Harness, harness, report, task};
use rstest::rstest;
use taskbridge::integration::{
    adapters::memory::TrackerOperation,
    domain::{LedgerStatus, PullRequestState},
};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn repeated_runs_create_each_object_once(harness: Harness) {
    let spec = task("T100", "Add rate limiting");
    let task_report = report(&["src/lib.rs"]);

    for _ in 0..3 {
        let outcome = harness.run(&spec, &task_report).await;
        assert_eq!(outcome.exit_code(), 0, "run failed: {outcome:?}");
    }

    assert_eq!(harness.tracker.issues().len(), 1);
    assert_eq!(harness.tracker.pull_requests().len(), 1);
    assert_eq!(harness.tracker.call_count(TrackerOperation::CreateIssue), 1);
    assert_eq!(
        harness.tracker.call_count(TrackerOperation::CreatePullRequest),
        1
    );
    assert_eq!(harness.repo.commit_messages().len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn integrated_entry_is_never_rewritten_as_pending(harness: Harness) {
    let spec = task("T101", "Add request tracing");
    let task_report = report(&["src/lib.rs"]);

    harness.run(&spec, &task_report).await;
    harness.run(&spec, &task_report).await;

    let statuses: Vec<LedgerStatus> = harness
        .ledger
        .history()
        .iter()
        .map(|entry| entry.status())
        .collect();
    let first_integrated = statuses
        .iter()
        .position(|status| *status == LedgerStatus::Integrated)
        .expect("an integrated write");
    assert!(
        statuses
            .iter()
            .skip(first_integrated)
            .all(|status| *status == LedgerStatus::Integrated),
        "ledger regressed: {statuses:?}"
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn changed_report_refreshes_remote_bodies(harness: Harness) {
    let spec = task("T102", "Add audit log");
    let first_report = report(&["src/lib.rs"]);
    harness.run(&spec, &first_report).await;

    let mut second_report = first_report.clone();
    second_report.summary = vec!["Audit entries are now signed".to_owned()];
    let outcome = harness.run(&spec, &second_report).await;

    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(harness.tracker.call_count(TrackerOperation::UpdateIssue), 1);
    assert_eq!(
        harness.tracker.call_count(TrackerOperation::UpdatePullRequest),
        1
    );
    assert!(
        harness
            .tracker
            .issues()
            .iter()
            .all(|issue| issue.body.contains("Audit entries are now signed"))
    );
    let entry = outcome.entry().expect("entry recorded");
    assert_eq!(
        entry.report_digest(),
        Some(second_report.digest().as_str())
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn merged_work_is_recognised_on_rerun(harness: Harness) {
    let spec = task("T103", "Fix cache eviction");
    let task_report = report(&["src/lib.rs"]);
    let first = harness.run(&spec, &task_report).await;
    let entry = first.entry().expect("entry recorded");
    let issue = entry.issue().expect("issue recorded").number;
    let pull = entry.pull_request().expect("pull request recorded").number;
    harness
        .tracker
        .set_pull_request_state(pull, PullRequestState::Merged);
    harness.tracker.close_issue(issue);

    let second = harness.run(&spec, &task_report).await;

    assert_eq!(second.exit_code(), 0, "rerun failed: {second:?}");
    let rerun = second.entry().expect("entry recorded");
    assert_eq!(rerun.issue().map(|found| found.number), Some(issue));
    assert_eq!(rerun.pull_request().map(|found| found.number), Some(pull));
    assert_eq!(harness.tracker.issues().len(), 1);
    assert_eq!(harness.tracker.pull_requests().len(), 1);
}
