//! Conflict resolution
//!
//! Turns violations into candidate dates. Every function here is pure: it
//! returns proposals and leaves applying them to the caller, who must
//! re-validate because fixing one edge can break another.

use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info};

use super::checker::check_dates;
use super::error::ScheduleError;
use super::graph::{DependencyGraph, TaskSnapshot};
use super::id::TaskId;
use super::temporal::{add_days, duration_days, DateRange};
use super::violation::{Violation, ViolationKind};

/// Upper bound on fix iterations when none is configured
pub const DEFAULT_MAX_ITERATIONS: u32 = 32;

/// A proposed date change for one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixProposal {
    pub task_id: TaskId,
    /// Dates the proposal was computed from
    pub from: DateRange,
    /// Suggested dates, same duration as `from`
    pub to: DateRange,
}

impl FixProposal {
    /// Number of days the task moves (negative when pulled earlier)
    pub fn shift_days(&self) -> i64 {
        duration_days(self.from.start(), self.to.start())
    }
}

/// Which dependency violations a resolution pass must clear
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FixScope {
    #[default]
    MandatoryOnly,
    All,
}

impl FixScope {
    fn includes(&self, violation: &Violation) -> bool {
        violation.kind == ViolationKind::Dependency
            && match self {
                FixScope::MandatoryOnly => violation.is_mandatory(),
                FixScope::All => true,
            }
    }
}

/// Computes the auto-fix for one violation
///
/// The task keeps its duration. It moves to the required start when there is
/// one, otherwise it is placed so that it ends on the required deadline.
/// Fails with `Unresolvable` when the violation carries no dates to work
/// from, as with status-only blocking.
pub fn auto_fix(violation: &Violation) -> Result<FixProposal, ScheduleError> {
    let current = violation.current_dates().ok_or_else(|| {
        ScheduleError::Unresolvable(format!(
            "no current dates for {} to shift",
            violation.task_id
        ))
    })?;

    let duration = current.duration_days();
    let new_start = match (violation.required_start_date, violation.required_deadline) {
        (Some(start), _) => start,
        (None, Some(deadline)) => add_days(deadline, -duration),
        (None, None) => {
            return Err(ScheduleError::Unresolvable(format!(
                "violation on {} has no required date",
                violation.task_id
            )))
        }
    };
    let to = DateRange::new(new_start, add_days(new_start, duration))?;

    debug!(
        task = %violation.task_id,
        from = %current,
        to = %to,
        "computed auto-fix"
    );

    Ok(FixProposal {
        task_id: violation.task_id.clone(),
        from: current,
        to,
    })
}

/// Repeatedly checks and fixes the proposed dates until no in-scope
/// dependency violation remains
///
/// Returns the final dates, which equal `proposed` when nothing needed
/// fixing. Gives up with `Unresolvable` after `max_iterations` fixes, which
/// happens when constraints pull the task in opposite directions.
pub fn resolve(
    snapshot: &TaskSnapshot,
    proposed: DateRange,
    max_iterations: u32,
    scope: FixScope,
) -> Result<DateRange, ScheduleError> {
    let mut current = proposed;

    for iteration in 0..=max_iterations {
        let pending = check_dates(snapshot, current)
            .into_iter()
            .find(|v| scope.includes(v));

        let Some(violation) = pending else {
            debug!(task = %snapshot.task.id, iterations = iteration, dates = %current, "resolved");
            return Ok(current);
        };

        if iteration == max_iterations {
            break;
        }
        current = auto_fix(&violation)?.to;
    }

    Err(ScheduleError::Unresolvable(format!(
        "dates for {} did not converge after {} fixes",
        snapshot.task.id, max_iterations
    )))
}

/// Plans new dates for everything downstream of `origin`
///
/// Successors reachable from `origin` are visited in topological order and
/// pushed later until their mandatory predecessor constraints hold against
/// the already-planned dates. Passes repeat until nothing moves. `origin`
/// itself and unscheduled tasks never move. Returns one proposal per task
/// that changed, in topological order; the graph is not modified.
pub fn reschedule_chain(
    graph: &DependencyGraph,
    origin: &TaskId,
    max_iterations: u32,
) -> Result<Vec<FixProposal>, ScheduleError> {
    let affected: HashSet<TaskId> = graph.downstream_of(origin)?.into_iter().collect();
    let order: Vec<TaskId> = graph
        .topological_order()?
        .into_iter()
        .filter(|id| affected.contains(id))
        .collect();

    let mut working = graph.clone();

    // Up to `max_iterations` passes may move tasks; the pass after them only
    // confirms the plan has settled
    for pass in 0..=max_iterations {
        let mut moved = 0;

        for task_id in &order {
            let snapshot = working.snapshot(task_id)?;
            let Some(current) = snapshot.task.dates() else {
                continue;
            };

            // Only upstream constraints push a successor; its own successors
            // are handled when their turn comes
            let upstream = TaskSnapshot {
                successors: Vec::new(),
                ..snapshot
            };
            let pending = check_dates(&upstream, current)
                .into_iter()
                .find(Violation::is_mandatory);

            if let Some(violation) = pending {
                let fix = auto_fix(&violation)?;
                working.set_dates(task_id, fix.to)?;
                moved += 1;
            }
        }

        if moved == 0 {
            let plan = collect_changes(graph, &working, &order)?;
            info!(origin = %origin, passes = pass + 1, moved = plan.len(), "planned reschedule");
            return Ok(plan);
        }
    }

    Err(ScheduleError::Unresolvable(format!(
        "rescheduling after {} did not settle within {} passes",
        origin, max_iterations
    )))
}

fn collect_changes(
    before: &DependencyGraph,
    after: &DependencyGraph,
    order: &[TaskId],
) -> Result<Vec<FixProposal>, ScheduleError> {
    let mut plan = Vec::new();
    for task_id in order {
        let (Some(from), Some(to)) = (before.task(task_id)?.dates(), after.task(task_id)?.dates())
        else {
            continue;
        };
        if from != to {
            plan.push(FixProposal {
                task_id: task_id.clone(),
                from,
                to,
            });
        }
    }
    Ok(plan)
}
