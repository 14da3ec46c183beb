//! depgate - dependency scheduling and date-conflict validation
//!
//! Tasks are linked by `FS`/`SS`/`FF`/`SF` dependencies with lag or lead.
//! The engine reports which edges block a status change, which proposed
//! dates break an edge or the project range, and what dates would fix them.

pub mod domain;
pub mod storage;
pub mod cli;

pub use domain::{
    DateRange, DependencyEdge, DependencyGraph, EdgeId, RelationType, ScheduleError, Task,
    TaskId, TaskStatus, Violation, ViolationReport,
};
