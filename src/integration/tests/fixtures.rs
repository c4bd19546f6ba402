//! Shared builders for integration unit tests.

use std::time::Duration;

use crate::integration::{
    domain::{
        AGENT_TASK_LABEL, ArtifactChange, CriterionResult, IssueNumber, IssueState,
        PullRequestNumber, PullRequestState, RemoteIssue, RemotePullRequest, Report, TaskKey,
        TaskSpec, Verification,
    },
    services::RetryPolicy,
};

pub const TASK_ID: &str = "T001";

pub fn key() -> TaskKey {
    TaskKey::new(TASK_ID).expect("valid task key")
}

pub fn task() -> TaskSpec {
    TaskSpec::new(key(), "Add user authentication")
        .expect("valid task")
        .with_goal("Let users sign in with a password")
        .with_acceptance_criteria([
            "Users can log in".to_owned(),
            "Invalid passwords are rejected".to_owned(),
        ])
}

pub fn report() -> Report {
    Report {
        status: "completed".to_owned(),
        summary: vec!["Added a login handler".to_owned()],
        criteria_results: vec![
            CriterionResult {
                criterion: "Users can log in".to_owned(),
                passed: true,
                evidence: None,
            },
            CriterionResult {
                criterion: "Invalid passwords are rejected".to_owned(),
                passed: false,
                evidence: Some("pending fixture".to_owned()),
            },
        ],
        files_modified: vec![ArtifactChange {
            path: "src/auth.rs".to_owned(),
            description: "login handler".to_owned(),
        }],
        verification: Verification {
            commands_run: vec!["cargo test".to_owned()],
            results: vec!["12 passed".to_owned()],
        },
        risks: Vec::new(),
        next_steps: Vec::new(),
    }
}

pub fn report_without_changes() -> Report {
    Report {
        files_modified: Vec::new(),
        ..report()
    }
}

/// Retries quickly enough for unit tests.
pub const fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(1))
}

pub fn remote_issue(number: u64, title: &str, labels: &[&str], state: IssueState) -> RemoteIssue {
    RemoteIssue {
        number: IssueNumber::new(number).expect("valid issue number"),
        title: title.to_owned(),
        body: String::new(),
        labels: labels.iter().map(|label| (*label).to_owned()).collect(),
        state,
        url: format!("https://github.com/acme/widgets/issues/{number}"),
    }
}

pub fn owned_issue(number: u64, state: IssueState) -> RemoteIssue {
    remote_issue(
        number,
        "[T001] Add user authentication",
        &[AGENT_TASK_LABEL],
        state,
    )
}

pub fn remote_pull(number: u64, head: &str, state: PullRequestState) -> RemotePullRequest {
    RemotePullRequest {
        number: PullRequestNumber::new(number).expect("valid pull request number"),
        title: "[T001] Add user authentication".to_owned(),
        head: head.to_owned(),
        base: "main".to_owned(),
        body: String::new(),
        state,
        url: format!("https://github.com/acme/widgets/pull/{number}"),
    }
}
