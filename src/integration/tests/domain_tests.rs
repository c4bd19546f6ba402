//! Tests for integration domain value objects.

use super::fixtures::{key, report, task};
use crate::integration::domain::{
    AuthPolicy, BranchName, ChangeType, CommitMessage, IntegrationDomainError, IssueNumber, ReconcileStage,
    RepositoryFullName, TaskKey, TaskSpec, TitlePrefix,
};
use rstest::rstest;

#[rstest]
fn long_titles_produce_bounded_branch_names() {
    let name = BranchName::for_task(
        &key(),
        "Add user authentication with a very long descriptive name",
    )
    .expect("valid branch name");

    assert_eq!(name.as_str(), "feature/t001-add-user-authentication-with-a");
    assert!(name.as_str().chars().count() <= 50);
    assert_eq!(name.as_str(), name.as_str().to_lowercase());
}

#[rstest]
#[case("T002", "Fix: login!! bug", "feature/t002-fix-login-bug")]
#[case("t_003", "Docs", "feature/t_003-docs")]
#[case("T004", "  Spaces   and --- dashes ", "feature/t004-spaces-and-dashes")]
#[case("T005", "!!!", "feature/t005")]
fn branch_names_are_normalised(#[case] id: &str, #[case] title: &str, #[case] expected: &str) {
    let task_key = TaskKey::new(id).expect("valid task key");
    let name = BranchName::for_task(&task_key, title).expect("valid branch name");
    assert_eq!(name.as_str(), expected);
}

#[rstest]
fn task_keys_are_stored_in_upper_case() {
    let lower = TaskKey::new(" t001 ").expect("valid task key");
    assert_eq!(lower, key());
    assert_eq!(TitlePrefix::for_task(&lower).as_str(), "[T001]");
}

#[rstest]
#[case("")]
#[case("t.1")]
#[case("T-1")]
#[case("T1-")]
#[case("-T1")]
#[case("_T1")]
#[case("T 1")]
fn malformed_task_keys_are_rejected(#[case] value: &str) {
    assert!(matches!(
        TaskKey::new(value),
        Err(IntegrationDomainError::InvalidTaskKey(_))
    ));
}

#[rstest]
fn distinct_task_keys_never_share_a_branch() {
    let names: Vec<String> = ["T_1", "T1", "T01", "T1_0"]
        .into_iter()
        .map(|id| {
            let task_key = TaskKey::new(id).expect("valid task key");
            BranchName::for_task(&task_key, "Add login")
                .expect("valid branch name")
                .to_string()
        })
        .collect();

    assert_eq!(
        names,
        [
            "feature/t_1-add-login",
            "feature/t1-add-login",
            "feature/t01-add-login",
            "feature/t1_0-add-login",
        ]
    );
}

#[rstest]
fn branch_names_are_deterministic() {
    let first = BranchName::for_task(&key(), "Add user authentication").expect("valid");
    let second = BranchName::for_task(&key(), "Add user authentication").expect("valid");
    assert_eq!(first, second);
}

#[rstest]
#[case("")]
#[case("feature/has space")]
#[case("feature/a..b")]
#[case("feature/colon:name")]
#[case("feature/x.lock")]
#[case("-leading")]
fn malformed_branch_names_are_rejected(#[case] value: &str) {
    assert!(matches!(
        BranchName::new(value),
        Err(IntegrationDomainError::InvalidBranchName(_))
    ));
}

#[rstest]
#[case("[T001] Add login", true)]
#[case("[T001]", true)]
#[case("[T0011] Other task", false)]
#[case("Re: [T001] Add login", false)]
#[case("[t001] Add login", false)]
fn title_prefix_matches_exactly(#[case] title: &str, #[case] expected: bool) {
    assert_eq!(TitlePrefix::for_task(&key()).matches(title), expected);
}

#[rstest]
#[case("git@github.com:acme/widgets.git")]
#[case("https://github.com/acme/widgets")]
#[case("https://github.com/acme/widgets.git")]
#[case("ssh://git@github.com/acme/widgets.git")]
fn repository_is_detected_from_remote_url(#[case] url: &str) {
    let repository = RepositoryFullName::from_remote_url(url).expect("github remote");
    assert_eq!(repository.as_str(), "acme/widgets");
    assert_eq!(repository.owner(), "acme");
}

#[rstest]
fn non_github_remote_is_rejected() {
    assert!(RepositoryFullName::from_remote_url("https://gitlab.com/acme/widgets").is_err());
}

#[rstest]
#[case(ReconcileStage::Init, ReconcileStage::AuthChecked, true)]
#[case(ReconcileStage::AuthChecked, ReconcileStage::IssueResolved, true)]
#[case(ReconcileStage::IssueResolved, ReconcileStage::BranchReady, true)]
#[case(ReconcileStage::IssueResolved, ReconcileStage::LedgerUpdated, true)]
#[case(ReconcileStage::BranchReady, ReconcileStage::LedgerUpdated, true)]
#[case(ReconcileStage::BranchReady, ReconcileStage::PrResolved, true)]
#[case(ReconcileStage::PrResolved, ReconcileStage::LedgerUpdated, true)]
#[case(ReconcileStage::PrResolved, ReconcileStage::Failed, true)]
#[case(ReconcileStage::Init, ReconcileStage::IssueResolved, false)]
#[case(ReconcileStage::AuthChecked, ReconcileStage::PrResolved, false)]
#[case(ReconcileStage::LedgerUpdated, ReconcileStage::Failed, false)]
#[case(ReconcileStage::Failed, ReconcileStage::Init, false)]
fn stage_transitions_follow_the_state_machine(
    #[case] from: ReconcileStage,
    #[case] to: ReconcileStage,
    #[case] allowed: bool,
) {
    assert_eq!(from.can_transition_to(to), allowed);
}

#[rstest]
fn invalid_stage_advance_leaves_stage_unchanged() {
    let mut stage = ReconcileStage::Init;
    let result = stage.advance(ReconcileStage::PrResolved);

    assert!(matches!(
        result,
        Err(IntegrationDomainError::InvalidStageTransition { .. })
    ));
    assert_eq!(stage, ReconcileStage::Init);
}

#[rstest]
#[case("Fix login bug", ChangeType::Fix)]
#[case("Add integration tests", ChangeType::Test)]
#[case("Update docs for setup", ChangeType::Docs)]
#[case("Refactor session store", ChangeType::Refactor)]
#[case("Add user authentication", ChangeType::Feature)]
fn change_type_is_inferred_from_title(#[case] title: &str, #[case] expected: ChangeType) {
    let spec = TaskSpec::new(key(), title).expect("valid task");
    assert_eq!(spec.change_type(), expected);
}

#[rstest]
fn commit_message_without_report_uses_goal_and_criteria() {
    let message = CommitMessage::for_task(&task(), None, None);

    assert_eq!(message.header(), "feat(T001): add user authentication");
    assert_eq!(
        message.body(),
        [
            "- Let users sign in with a password",
            "- Users can log in",
            "- Invalid passwords are rejected",
        ]
    );
    assert!(message.footers().is_empty());
}

#[rstest]
fn commit_message_with_report_closes_issue_and_carries_digest() {
    let task_report = report();
    let issue = IssueNumber::new(12).expect("valid issue number");
    let message = CommitMessage::for_task(&task(), Some(&task_report), Some(issue));

    assert_eq!(message.body(), ["- Added a login handler"]);
    assert_eq!(
        message.footers(),
        [
            "Closes #12".to_owned(),
            format!("Agent-Report: {}", task_report.digest()),
        ]
    );
    let rendered = message.to_string();
    assert!(rendered.starts_with("feat(T001): add user authentication\n\n- Added"));
}

#[rstest]
fn commit_summary_is_sanitised_and_capped() {
    let spec = TaskSpec::new(
        key(),
        "Implement OAuth2 (PKCE) flow: tokens, refresh & revocation for every provider",
    )
    .expect("valid task")
    .with_change_type(ChangeType::Feature);
    let message = CommitMessage::for_task(&spec, None, None);
    let summary = message
        .header()
        .strip_prefix("feat(T001): ")
        .expect("conventional header");

    assert!(summary.chars().count() <= 50);
    assert!(!summary.contains(['(', ')', ':', '&']));
    assert_eq!(summary, summary.to_lowercase());
}

#[rstest]
fn report_digest_is_short_and_stable() {
    let first = report().digest();
    let second = report().digest();

    assert_eq!(first, second);
    assert_eq!(first.len(), 12);
    assert!(first.chars().all(|ch| ch.is_ascii_hexdigit()));

    let mut changed = report();
    changed.summary.push("Another line".to_owned());
    assert_ne!(changed.digest(), first);
}

#[rstest]
#[case(AuthPolicy::Interactive, true)]
#[case(AuthPolicy::NonInteractive, false)]
#[case(AuthPolicy::Skip, false)]
fn only_interactive_runs_suggest_logging_in(#[case] policy: AuthPolicy, #[case] hinted: bool) {
    let hint = policy.login_hint();
    assert_eq!(hint.is_some(), hinted);
    if let Some(text) = hint {
        assert!(text.contains("gh auth login"));
    }
}
