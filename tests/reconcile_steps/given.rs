//! Given steps for reconciliation BDD scenarios.

use super::world::ReconcileWorld;
use eyre::WrapErr;
use rstest_bdd_macros::given;
use taskbridge::integration::{
    adapters::memory::TrackerOperation,
    domain::{
        ArtifactChange, CriterionResult, IssueState, Report, TaskKey, TaskSpec, Verification,
    },
    ports::TrackerError,
};

#[given(r#"a completed task "{id}" titled "{title}""#)]
fn completed_task(
    world: &mut ReconcileWorld,
    id: String,
    title: String,
) -> Result<(), eyre::Report> {
    let key = TaskKey::new(&id).wrap_err("construct task key")?;
    let spec = TaskSpec::new(key, &title)
        .wrap_err("construct task definition")?
        .with_goal(format!("Deliver {title}"))
        .with_acceptance_criteria(["Behaviour is covered".to_owned()]);
    world.task = Some(spec);
    Ok(())
}

#[given(r#"the task report lists changes to "{path}""#)]
fn report_lists_changes(world: &mut ReconcileWorld, path: String) {
    world.repo.write_file(&path);
    world.report = Some(Report {
        status: "completed".to_owned(),
        summary: vec!["Implemented the change".to_owned()],
        criteria_results: vec![CriterionResult {
            criterion: "Behaviour is covered".to_owned(),
            passed: true,
            evidence: None,
        }],
        files_modified: vec![ArtifactChange {
            path,
            description: "updated".to_owned(),
        }],
        verification: Verification {
            commands_run: vec!["make test".to_owned()],
            results: vec!["all green".to_owned()],
        },
        risks: Vec::new(),
        next_steps: Vec::new(),
    });
}

#[given("no tracker credentials are available")]
fn no_credentials(world: &mut ReconcileWorld) {
    world.authenticated = false;
}

#[given("issue-only mode is requested")]
fn issue_only_mode(world: &mut ReconcileWorld) {
    world.options = world.options.clone().with_skip_pr(true);
}

#[given(r#"the tracker already has an unlabelled issue titled "{title}""#)]
fn unlabelled_issue(world: &mut ReconcileWorld, title: String) -> Result<(), eyre::Report> {
    world
        .tracker
        .seed_issue(&title, &[], IssueState::Open)
        .wrap_err("seed unlabelled issue")?;
    Ok(())
}

#[given("the tracker loses the response to the next issue creation")]
fn lose_issue_creation_response(world: &mut ReconcileWorld) {
    world.tracker.lose_next_response(
        TrackerOperation::CreateIssue,
        TrackerError::Transient("connection reset after write".to_owned()),
    );
}
