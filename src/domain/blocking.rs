//! Status-based blocking
//!
//! An edge blocks while the task on its other side has not reached the state
//! the relation waits for: finish-type relations (`FS`, `FF`) wait for `Done`,
//! start-type relations (`SS`, `SF`) wait for work to begin.

use serde::Serialize;
use tracing::debug;

use super::edge::RelationType;
use super::graph::{EdgeContext, TaskSnapshot};
use super::id::{EdgeId, TaskId};
use super::task::TaskStatus;
use super::violation::Violation;

/// Which side of an edge the evaluated task sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeRole {
    /// The task depends on the counterpart
    Successor,
    /// The counterpart depends on the task
    Predecessor,
}

/// Returns true if an edge blocks given its governing counterpart's status
pub fn is_blocking(relation: RelationType, counterpart: TaskStatus) -> bool {
    match relation {
        RelationType::FinishToStart | RelationType::FinishToFinish => !counterpart.is_complete(),
        RelationType::StartToStart | RelationType::StartToFinish => !counterpart.is_started(),
    }
}

/// Blocking state of one edge as seen from a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockingFlag {
    pub edge_id: EdgeId,
    pub role: EdgeRole,
    pub counterpart: TaskId,
    pub relation: RelationType,
    pub mandatory: bool,
    pub blocking: bool,
}

impl BlockingFlag {
    fn new(ctx: &EdgeContext, role: EdgeRole) -> Self {
        Self {
            edge_id: ctx.edge.id.clone(),
            role,
            counterpart: ctx.counterpart.id.clone(),
            relation: ctx.edge.relation,
            mandatory: ctx.edge.mandatory,
            blocking: is_blocking(ctx.edge.relation, ctx.counterpart.status),
        }
    }
}

/// Flags every edge touching the snapshot's task
pub fn blocking_flags(snapshot: &TaskSnapshot) -> Vec<BlockingFlag> {
    let upstream = snapshot
        .predecessors
        .iter()
        .map(|ctx| BlockingFlag::new(ctx, EdgeRole::Successor));
    let downstream = snapshot
        .successors
        .iter()
        .map(|ctx| BlockingFlag::new(ctx, EdgeRole::Predecessor));
    upstream.chain(downstream).collect()
}

/// Outcome of a requested status change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionDecision {
    pub task_id: TaskId,
    pub from: TaskStatus,
    pub to: TaskStatus,
    /// False when a mandatory predecessor still blocks
    pub allowed: bool,
    pub violations: Vec<Violation>,
}

impl TransitionDecision {
    /// Returns true if the only objections are advisory
    pub fn has_advisories(&self) -> bool {
        self.allowed && !self.violations.is_empty()
    }
}

/// Returns true if a predecessor edge of this relation gates entering `target`
fn gates(relation: RelationType, target: TaskStatus) -> bool {
    match target {
        TaskStatus::Doing => relation.gates_start(),
        TaskStatus::Done => true,
        TaskStatus::ToDo => false,
    }
}

/// Checks whether the snapshot's task may move to `target`
///
/// Only moves into `Doing` or `Done` are gated. Moving to `Doing` consults
/// start-gating predecessors (`FS`, `SS`); moving to `Done` consults all of
/// them. Blocking mandatory edges deny the move, blocking optional edges are
/// reported without denying it.
pub fn check_transition(snapshot: &TaskSnapshot, target: TaskStatus) -> TransitionDecision {
    let task = &snapshot.task;
    let mut violations = Vec::new();

    if task.status != target {
        for ctx in &snapshot.predecessors {
            let relation = ctx.edge.relation;
            if !gates(relation, target) || !is_blocking(relation, ctx.counterpart.status) {
                continue;
            }
            violations.push(blocking_violation(ctx, task.id.clone(), target));
        }
    }

    let allowed = !violations.iter().any(Violation::is_mandatory);
    debug!(
        task = %task.id,
        from = %task.status,
        to = %target,
        allowed,
        blocking = violations.len(),
        "evaluated status transition"
    );

    TransitionDecision {
        task_id: task.id.clone(),
        from: task.status,
        to: target,
        allowed,
        violations,
    }
}

fn blocking_violation(ctx: &EdgeContext, task_id: TaskId, target: TaskStatus) -> Violation {
    let relation = ctx.edge.relation;
    let pred = &ctx.counterpart;
    let waiting_for = match relation {
        RelationType::FinishToStart | RelationType::FinishToFinish => "finished",
        RelationType::StartToStart | RelationType::StartToFinish => "started",
    };
    let message = format!(
        "Cannot move to {}: {} dependency on '{}' ({}) requires it to be {}, but it is {}",
        target.label(),
        relation.label(),
        pred.title,
        pred.id,
        waiting_for,
        pred.status.label()
    );
    let suggestion = match relation {
        RelationType::FinishToStart | RelationType::FinishToFinish => {
            format!("Complete '{}' first or remove the dependency", pred.title)
        }
        RelationType::StartToStart | RelationType::StartToFinish => {
            format!("Start '{}' first or remove the dependency", pred.title)
        }
    };

    Violation::dependency(task_id, message)
        .on_edge(ctx.edge.id.clone(), relation, ctx.edge.mandatory)
        .with_suggestion(suggestion)
}
