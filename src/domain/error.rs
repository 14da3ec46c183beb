//! Errors returned by the scheduling engine

use chrono::NaiveDate;
use thiserror::Error;

use super::id::{EdgeId, TaskId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("Dependency not found: {0}")]
    EdgeNotFound(EdgeId),

    #[error("Invalid relation type '{0}': expected one of FS, SS, FF, SF")]
    InvalidRelation(String),

    #[error("Invalid lag {0}: must be between -365 and 365 days")]
    InvalidLag(i64),

    #[error("Invalid date range: end {end} is before start {start}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Cannot resolve conflict: {0}")]
    Unresolvable(String),

    #[error("Adding dependency would create a cycle: {predecessor} -> {successor}")]
    CycleDetected { predecessor: TaskId, successor: TaskId },

    #[error("Self-dependency not allowed: {0}")]
    SelfDependency(TaskId),

    #[error("Duplicate dependency: {0}")]
    DuplicateEdge(String),

    #[error("Unknown task status '{0}'")]
    InvalidStatus(String),

    #[error("Task {0} changed since the fix was computed")]
    StaleSnapshot(TaskId),
}

impl ScheduleError {
    /// Returns true for the not-found family (unknown task or edge)
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ScheduleError::TaskNotFound(_) | ScheduleError::EdgeNotFound(_)
        )
    }
}
