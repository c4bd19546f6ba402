//! Tests for issue and pull request body rendering.

use super::fixtures::{key, report, task};
use crate::integration::{
    domain::{IssueNumber, TaskSpec},
    services::render,
};
use rstest::rstest;

fn issue_number() -> IssueNumber {
    IssueNumber::new(12).expect("valid issue number")
}

#[rstest]
fn issue_body_lists_goal_criteria_and_report() {
    let task_report = report();
    let body = render::issue_body(&task(), Some(&task_report)).expect("renders");

    assert!(body.starts_with("## Goal\n\nLet users sign in with a password"));
    assert!(body.contains("- [x] Users can log in"));
    assert!(body.contains("- [ ] Invalid passwords are rejected"));
    assert!(body.contains("## Implementation Report"));
    assert!(body.contains("**Status:** completed"));
    assert!(body.contains("- `src/auth.rs`: login handler"));
    assert!(body.contains("- 12 passed"));
    assert!(body.ends_with("_Managed by taskbridge for task T001._"));
}

#[rstest]
fn issue_body_without_report_falls_back_to_title_and_unchecked_criteria() {
    let spec = TaskSpec::new(key(), "Add user authentication")
        .expect("valid task")
        .with_acceptance_criteria(["Users can log in".to_owned()]);
    let body = render::issue_body(&spec, None).expect("renders");

    assert!(body.starts_with("## Goal\n\nAdd user authentication"));
    assert!(body.contains("- [ ] Users can log in"));
    assert!(!body.contains("## Context"));
    assert!(!body.contains("## Implementation Report"));
}

#[rstest]
fn issue_body_is_deterministic() {
    let task_report = report();
    let first = render::issue_body(&task(), Some(&task_report)).expect("renders");
    let second = render::issue_body(&task(), Some(&task_report)).expect("renders");
    assert_eq!(first, second);
}

#[rstest]
fn criteria_results_match_by_position_when_text_differs() {
    let mut task_report = report();
    for result in &mut task_report.criteria_results {
        result.criterion = format!("Reworded: {}", result.criterion);
    }
    let body = render::issue_body(&task(), Some(&task_report)).expect("renders");

    assert!(body.contains("- [x] Users can log in"));
    assert!(body.contains("- [ ] Invalid passwords are rejected"));
}

#[rstest]
fn pull_request_body_closes_issue_and_lists_verification() {
    let task_report = report();
    let body =
        render::pull_request_body(&task(), Some(&task_report), issue_number()).expect("renders");

    assert!(body.starts_with("## Task\n\nCloses #12"));
    assert!(body.contains("- Added a login handler"));
    assert!(body.contains("## Changes"));
    assert!(body.contains("- `cargo test`"));
    assert!(body.contains("- 12 passed"));
    assert!(body.contains("## Checklist"));
    assert!(body.contains("- [x] Users can log in"));
}

#[rstest]
fn pull_request_body_without_report_summarises_goal() {
    let body = render::pull_request_body(&task(), None, issue_number()).expect("renders");

    assert!(body.contains("Let users sign in with a password"));
    assert!(!body.contains("## Changes"));
    assert!(!body.contains("## Verification"));
}

#[rstest]
fn pull_request_title_carries_task_prefix() {
    assert_eq!(
        render::pull_request_title(&task()),
        "[T001] Add user authentication"
    );
}
