//! Then steps for reconciliation BDD scenarios.

use super::world::{ReconcileWorld, run_async};
use rstest_bdd_macros::then;
use taskbridge::integration::{
    domain::{LedgerEntry, LedgerStatus},
    ports::LedgerStore,
};

fn stored_entry(world: &ReconcileWorld) -> Result<LedgerEntry, eyre::Report> {
    let key = world
        .task
        .as_ref()
        .map(|task| task.key().clone())
        .ok_or_else(|| eyre::eyre!("missing task in scenario world"))?;
    run_async(world.ledger.get(&key))
        .map_err(|err| eyre::eyre!("ledger read failed: {err}"))?
        .ok_or_else(|| eyre::eyre!("no ledger entry for {key}"))
}

#[then("the run exits with code {code:u8}")]
fn run_exits_with(world: &ReconcileWorld, code: u8) -> Result<(), eyre::Report> {
    let outcome = world.outcome()?;
    eyre::ensure!(
        outcome.exit_code() == code,
        "expected exit code {code}, got {}: {outcome:?}",
        outcome.exit_code()
    );
    Ok(())
}

#[then("the tracker issue count is {count:usize}")]
fn tracker_issue_count(world: &ReconcileWorld, count: usize) -> Result<(), eyre::Report> {
    let actual = world.tracker.issues().len();
    eyre::ensure!(actual == count, "expected {count} issues, found {actual}");
    Ok(())
}

#[then("the tracker pull request count is {count:usize}")]
fn tracker_pull_request_count(world: &ReconcileWorld, count: usize) -> Result<(), eyre::Report> {
    let actual = world.tracker.pull_requests().len();
    eyre::ensure!(
        actual == count,
        "expected {count} pull requests, found {actual}"
    );
    Ok(())
}

#[then("the ledger records the task as integrated")]
fn ledger_records_integrated(world: &ReconcileWorld) -> Result<(), eyre::Report> {
    let entry = stored_entry(world)?;
    eyre::ensure!(
        entry.status() == LedgerStatus::Integrated,
        "expected integrated entry, found {}",
        entry.status().as_str()
    );
    eyre::ensure!(entry.issue().is_some(), "integrated entry lacks an issue");
    eyre::ensure!(
        entry.pull_request().is_some(),
        "integrated entry lacks a pull request"
    );
    Ok(())
}

#[then("the task commit count is {count:usize}")]
fn task_commit_count(world: &ReconcileWorld, count: usize) -> Result<(), eyre::Report> {
    let actual = world.repo.commit_messages().len();
    eyre::ensure!(actual == count, "expected {count} commits, found {actual}");
    Ok(())
}

#[then("no tracker calls were made")]
fn no_tracker_calls(world: &ReconcileWorld) -> Result<(), eyre::Report> {
    let calls = world.tracker.total_calls();
    eyre::ensure!(calls == 0, "expected no tracker calls, found {calls}");
    Ok(())
}

#[then("the ledger records the pull request as skipped")]
fn ledger_records_pr_skipped(world: &ReconcileWorld) -> Result<(), eyre::Report> {
    let entry = stored_entry(world)?;
    eyre::ensure!(
        entry.status() == LedgerStatus::Integrated && entry.pr_skipped(),
        "expected an integrated entry with the pull request skipped"
    );
    Ok(())
}

#[then(r#"the ledger records a "{kind}" failure"#)]
fn ledger_records_failure(world: &ReconcileWorld, kind: String) -> Result<(), eyre::Report> {
    let entry = stored_entry(world)?;
    eyre::ensure!(
        entry.status() == LedgerStatus::Failed,
        "expected failed entry, found {}",
        entry.status().as_str()
    );
    let recorded = entry
        .error()
        .map(|error| error.kind.as_str())
        .ok_or_else(|| eyre::eyre!("failed entry has no recorded error"))?;
    eyre::ensure!(recorded == kind, "expected {kind} failure, found {recorded}");
    Ok(())
}
