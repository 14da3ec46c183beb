//! Date constraint checking
//!
//! Given proposed dates for a task, every edge touching it is checked on its
//! own against the stored dates of the task on the other side. There is no
//! propagation here: fixing one edge can break another, and callers that want
//! a consistent result iterate through [`super::resolver::resolve`].
//!
//! | Relation | Requirement                              |
//! |----------|------------------------------------------|
//! | FS       | successor.start ≥ predecessor.end + lag  |
//! | SS       | successor.start ≥ predecessor.start + lag|
//! | FF       | successor.end ≥ predecessor.end + lag    |
//! | SF       | successor.end ≥ predecessor.start + lag  |

use chrono::NaiveDate;
use tracing::{debug, trace};

use super::edge::{DateField, DependencyEdge};
use super::graph::{EdgeContext, TaskSnapshot};
use super::id::TaskId;
use super::temporal::DateRange;
use super::violation::Violation;

/// Checks the proposed dates against every edge in the snapshot
pub fn check_dates(snapshot: &TaskSnapshot, proposed: DateRange) -> Vec<Violation> {
    let task_id = &snapshot.task.id;
    let mut violations = Vec::new();

    for ctx in &snapshot.predecessors {
        if let Some(v) = check_as_successor(task_id, ctx, proposed) {
            violations.push(v);
        }
    }

    for ctx in &snapshot.successors {
        if let Some(v) = check_as_predecessor(task_id, ctx, proposed) {
            violations.push(v);
        }
    }

    debug!(
        task = %task_id,
        proposed = %proposed,
        edges = snapshot.predecessors.len() + snapshot.successors.len(),
        violations = violations.len(),
        "checked dates"
    );
    violations
}

/// Checks a single edge where the task is the successor
///
/// Returns `None` when the edge holds or the predecessor is unscheduled.
pub fn check_as_successor(
    task_id: &TaskId,
    ctx: &EdgeContext,
    proposed: DateRange,
) -> Option<Violation> {
    let edge = &ctx.edge;
    let Some(pred_dates) = ctx.counterpart.dates() else {
        trace!(edge = %edge.id, "predecessor unscheduled, skipping");
        return None;
    };

    let required = edge.required_successor_date(&pred_dates);
    let field = edge.relation.successor_field();
    let actual = field.of(&proposed);
    trace!(edge = %edge.id, %required, %actual, "checking as successor");

    if actual >= required {
        return None;
    }

    let message = format!(
        "{} dependency on '{}' ({}) requires {} on or after {}{}, but proposed {} is {}",
        edge.relation.label(),
        ctx.counterpart.title,
        ctx.counterpart.id,
        field.label(),
        required,
        lag_note(edge),
        field.label(),
        actual
    );
    let suggestion = format!("Move {} to {} or later", field.label(), required);

    Some(finish(
        Violation::dependency(task_id.clone(), message).with_suggestion(suggestion),
        edge,
        proposed,
        field,
        required,
    ))
}

/// Checks a single edge where the task is the predecessor
///
/// The same inequality is evaluated with the successor's stored dates, which
/// bounds how late this task may start or finish.
pub fn check_as_predecessor(
    task_id: &TaskId,
    ctx: &EdgeContext,
    proposed: DateRange,
) -> Option<Violation> {
    let edge = &ctx.edge;
    let Some(succ_dates) = ctx.counterpart.dates() else {
        trace!(edge = %edge.id, "successor unscheduled, skipping");
        return None;
    };

    if edge.is_satisfied(&proposed, &succ_dates) {
        return None;
    }

    let latest = edge.latest_predecessor_date(&succ_dates);
    let field = edge.relation.predecessor_field();
    let actual = field.of(&proposed);

    let message = format!(
        "{} dependency from '{}' ({}) requires {} on or before {}{}, but proposed {} is {}",
        edge.relation.label(),
        ctx.counterpart.title,
        ctx.counterpart.id,
        field.label(),
        latest,
        lag_note(edge),
        field.label(),
        actual
    );
    let suggestion = format!(
        "Move {} to {} or earlier, or reschedule '{}'",
        field.label(),
        latest,
        ctx.counterpart.title
    );

    Some(finish(
        Violation::dependency(task_id.clone(), message).with_suggestion(suggestion),
        edge,
        proposed,
        field,
        latest,
    ))
}

fn finish(
    violation: Violation,
    edge: &DependencyEdge,
    proposed: DateRange,
    field: DateField,
    required: NaiveDate,
) -> Violation {
    let violation = violation
        .on_edge(edge.id.clone(), edge.relation, edge.mandatory)
        .with_current(proposed);
    match field {
        DateField::Start => violation.requiring_start(required),
        DateField::Deadline => violation.requiring_deadline(required),
    }
}

fn lag_note(edge: &DependencyEdge) -> String {
    match edge.lag.days() {
        0 => String::new(),
        n if n > 0 => format!(" (lag {})", edge.lag),
        _ => format!(" (lead {})", edge.lag),
    }
}

/// Checks the proposed dates against the owning project's range
pub fn check_project_bounds(
    task_id: &TaskId,
    proposed: DateRange,
    project: DateRange,
) -> Vec<Violation> {
    let mut violations = Vec::new();

    if proposed.start() < project.start() {
        violations.push(
            Violation::date_validation(
                task_id.clone(),
                format!(
                    "Start {} is before the project start {}",
                    proposed.start(),
                    project.start()
                ),
            )
            .with_suggestion(format!("Move start to {} or later", project.start()))
            .with_current(proposed)
            .requiring_start(project.start()),
        );
    }

    if proposed.end() > project.end() {
        violations.push(
            Violation::date_validation(
                task_id.clone(),
                format!(
                    "Deadline {} is after the project end {}",
                    proposed.end(),
                    project.end()
                ),
            )
            .with_suggestion(format!("Move deadline to {} or earlier", project.end()))
            .with_current(proposed)
            .requiring_deadline(project.end()),
        );
    }

    violations
}

/// Runs the project-boundary check (when a range is given) and the dependency check
pub fn validate_edit(
    snapshot: &TaskSnapshot,
    proposed: DateRange,
    project: Option<DateRange>,
) -> Vec<Violation> {
    let mut violations = project
        .map(|range| check_project_bounds(&snapshot.task.id, proposed, range))
        .unwrap_or_default();
    violations.extend(check_dates(snapshot, proposed));
    violations
}
