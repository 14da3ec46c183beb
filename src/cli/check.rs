//! Dry-run validation and downstream rescheduling

use anyhow::Result;
use tracing::debug;

use super::output::Output;
use super::parse_range;
use crate::domain::{
    reschedule_chain, resolve, validate_edit, DateRange, FixProposal, FixScope, TaskId,
    TaskSnapshot, ViolationReport,
};
use crate::storage::Project;

/// Proposes dates that clear every mandatory dependency violation
///
/// Returns `None` when nothing needs to move or the constraints cannot all
/// be met at once.
pub(super) fn suggest_fix(
    snapshot: &TaskSnapshot,
    proposed: DateRange,
    max_iterations: u32,
) -> Option<FixProposal> {
    match resolve(snapshot, proposed, max_iterations, FixScope::MandatoryOnly) {
        Ok(to) if to != proposed => Some(FixProposal {
            task_id: snapshot.task.id.clone(),
            from: proposed,
            to,
        }),
        Ok(_) => None,
        Err(e) => {
            debug!(task = %snapshot.task.id, error = %e, "no auto-fix available");
            None
        }
    }
}

/// Prints a report for an edit that was not applied
pub(super) fn render_blocked(
    output: &Output,
    task_id: &TaskId,
    proposed: DateRange,
    report: &ViolationReport,
    fix: Option<FixProposal>,
) {
    let options = report.options(fix);
    if output.is_json() {
        output.data(&serde_json::json!({
            "applied": false,
            "task_id": task_id,
            "proposed": proposed,
            "report": report,
            "options": options,
        }));
    } else {
        println!("Cannot move {} to {}:", task_id, proposed);
        output.report(report);
        output.options(&options);
    }
}

pub fn check(output: &Output, id_str: &str, start: &str, end: &str) -> Result<()> {
    let project = Project::open_current()?;
    let _lock = project.read_lock()?;
    let graph = project.load_graph()?;
    let config = &project.config().project;
    let task_id: TaskId = id_str.parse()?;

    let proposed = parse_range(start, end)?;
    let snapshot = graph.snapshot(&task_id)?;
    let report = ViolationReport::new(
        validate_edit(&snapshot, proposed, config.project.range()?),
        config.policy.allow_force,
    );
    let fix = if report.date_validation.is_empty() {
        suggest_fix(&snapshot, proposed, config.policy.max_fix_iterations)
    } else {
        None
    };
    let options = report.options(fix);

    if output.is_json() {
        output.data(&serde_json::json!({
            "task_id": task_id,
            "proposed": proposed,
            "can_proceed": report.can_proceed(false),
            "report": report,
            "options": options,
        }));
    } else {
        println!("Checking {} at {}", task_id, proposed);
        output.report(&report);
        output.options(&options);
    }

    Ok(())
}

pub fn reschedule(output: &Output, id_str: &str, dry_run: bool) -> Result<()> {
    let project = Project::open_current()?;
    let _lock = project.lock()?;
    let mut graph = project.load_graph()?;
    let task_id: TaskId = id_str.parse()?;

    let plan = reschedule_chain(
        &graph,
        &task_id,
        project.config().project.policy.max_fix_iterations,
    )?;

    if !dry_run && !plan.is_empty() {
        graph.apply(plan.iter().map(|fix| (fix.task_id.clone(), fix.to)))?;
        project.save_graph(&graph)?;
    }

    if output.is_json() {
        output.data(&serde_json::json!({
            "origin": task_id,
            "applied": !dry_run,
            "changes": plan,
        }));
        return Ok(());
    }

    if plan.is_empty() {
        output.success(&format!("Nothing downstream of {} needs to move", task_id));
        return Ok(());
    }

    let verb = if dry_run { "Would move" } else { "Moved" };
    println!("{} {} task(s):", verb, plan.len());
    output.proposals(&plan);

    Ok(())
}
