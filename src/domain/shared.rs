//! A lock-protected graph for callers that validate from several threads
//!
//! Auto-fixes are computed against a snapshot, so by the time one is applied
//! another caller may have moved the task. [`SharedGraph::apply_fix`] takes
//! the lock, confirms the task still has the dates the fix was computed from,
//! re-validates, and only then commits.

use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

use super::checker::check_dates;
use super::error::ScheduleError;
use super::graph::DependencyGraph;
use super::resolver::FixProposal;
use super::violation::Violation;

/// Result of applying a fix under the lock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// The fix would leave mandatory violations; nothing was written
    Rejected(Vec<Violation>),
}

#[derive(Debug, Clone, Default)]
pub struct SharedGraph {
    inner: Arc<Mutex<DependencyGraph>>,
}

impl SharedGraph {
    pub fn new(graph: DependencyGraph) -> Self {
        Self {
            inner: Arc::new(Mutex::new(graph)),
        }
    }

    /// Locks the graph for a read-modify-write cycle
    ///
    /// A poisoned lock is recovered: the graph is only mutated through
    /// methods that validate before writing.
    pub fn lock(&self) -> MutexGuard<'_, DependencyGraph> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Runs `f` with exclusive access to the graph
    pub fn with<T>(&self, f: impl FnOnce(&mut DependencyGraph) -> T) -> T {
        f(&mut self.lock())
    }

    /// Applies a fix if it is still based on the task's current dates
    pub fn apply_fix(&self, proposal: &FixProposal) -> Result<ApplyOutcome, ScheduleError> {
        let mut graph = self.lock();

        let snapshot = graph.snapshot(&proposal.task_id)?;
        if snapshot.task.dates() != Some(proposal.from) {
            warn!(task = %proposal.task_id, "fix computed against stale dates");
            return Err(ScheduleError::StaleSnapshot(proposal.task_id.clone()));
        }

        let remaining: Vec<_> = check_dates(&snapshot, proposal.to)
            .into_iter()
            .filter(Violation::is_mandatory)
            .collect();
        if !remaining.is_empty() {
            return Ok(ApplyOutcome::Rejected(remaining));
        }

        graph.set_dates(&proposal.task_id, proposal.to)?;
        info!(task = %proposal.task_id, to = %proposal.to, "applied fix");
        Ok(ApplyOutcome::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::edge::{DependencyEdge, Lag, RelationType};
    use crate::domain::id::TaskId;
    use crate::domain::resolver::auto_fix;
    use crate::domain::task::Task;
    use crate::domain::temporal::DateRange;
    use chrono::NaiveDate;
    use std::thread;

    fn range(start: (u32, u32), end: (u32, u32)) -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2025, start.0, start.1).unwrap(),
            NaiveDate::from_ymd_opt(2025, end.0, end.1).unwrap(),
        )
        .unwrap()
    }

    fn id(s: &str) -> TaskId {
        s.parse().unwrap()
    }

    fn shared() -> SharedGraph {
        let mut graph = DependencyGraph::new();
        graph
            .add_task(Task::new(id("a"), "A").with_dates(range((1, 1), (1, 10))))
            .unwrap();
        graph
            .add_task(Task::new(id("b"), "B").with_dates(range((1, 5), (1, 8))))
            .unwrap();
        graph
            .add_edge(DependencyEdge::new(
                id("a"),
                id("b"),
                RelationType::FinishToStart,
                Lag::new(2).unwrap(),
            ))
            .unwrap();
        SharedGraph::new(graph)
    }

    fn proposal_for_b(graph: &SharedGraph) -> FixProposal {
        let snapshot = graph.lock().snapshot(&id("b")).unwrap();
        let dates = snapshot.task.dates().unwrap();
        let violation = check_dates(&snapshot, dates).remove(0);
        auto_fix(&violation).unwrap()
    }

    #[test]
    fn applies_fresh_fix() {
        let graph = shared();
        let fix = proposal_for_b(&graph);

        assert_eq!(graph.apply_fix(&fix).unwrap(), ApplyOutcome::Applied);
        assert_eq!(
            graph.lock().task(&id("b")).unwrap().dates(),
            Some(range((1, 12), (1, 15)))
        );
    }

    #[test]
    fn second_apply_of_same_fix_is_stale() {
        let graph = shared();
        let fix = proposal_for_b(&graph);

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let graph = graph.clone();
                let fix = fix.clone();
                thread::spawn(move || graph.apply_fix(&fix))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let applied = results
            .iter()
            .filter(|r| matches!(r, Ok(ApplyOutcome::Applied)))
            .count();
        let stale = results
            .iter()
            .filter(|r| matches!(r, Err(ScheduleError::StaleSnapshot(_))))
            .count();
        assert_eq!((applied, stale), (1, 1));
    }

    #[test]
    fn rejects_fix_invalidated_by_upstream_move() {
        let graph = shared();
        let fix = proposal_for_b(&graph);

        graph.with(|g| g.set_dates(&id("a"), range((1, 1), (1, 20)))).unwrap();

        match graph.apply_fix(&fix).unwrap() {
            ApplyOutcome::Rejected(violations) => assert_eq!(violations.len(), 1),
            other => panic!("expected rejection, got {:?}", other),
        }
    }
}
