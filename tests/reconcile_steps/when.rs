//! When steps for reconciliation BDD scenarios.

use super::world::{ReconcileWorld, run_async};
use rstest_bdd_macros::when;
use tokio_util::sync::CancellationToken;

fn reconcile_once(world: &mut ReconcileWorld) -> Result<(), eyre::Report> {
    let task = world
        .task
        .clone()
        .ok_or_else(|| eyre::eyre!("missing task in scenario world"))?;
    let reconciler = world.reconciler();
    let outcome = run_async(reconciler.reconcile(
        &task,
        world.report.as_ref(),
        &world.options,
        &CancellationToken::new(),
    ));
    world.outcome = Some(outcome);
    Ok(())
}

#[when("the task is reconciled")]
fn task_is_reconciled(world: &mut ReconcileWorld) -> Result<(), eyre::Report> {
    reconcile_once(world)
}

#[when("the task is reconciled twice")]
fn task_is_reconciled_twice(world: &mut ReconcileWorld) -> Result<(), eyre::Report> {
    reconcile_once(world)?;
    let first = world.outcome()?;
    if first.exit_code() != 0 {
        return Err(eyre::eyre!("first run failed: {first:?}"));
    }
    reconcile_once(world)
}
