//! Scheduling engine for dependent tasks
//!
//! Contains the core business logic without any I/O concerns. Callers hand in
//! tasks and edges, the engine hands back violations, blocking flags and
//! suggested dates.

mod id;
mod error;
mod temporal;
mod task;
mod edge;
mod graph;
mod violation;
mod blocking;
mod checker;
mod resolver;
mod report;
mod shared;

pub use id::{EdgeId, IdError, TaskId};
pub use error::ScheduleError;
pub use temporal::{add_days, days_between, duration_days, inclusive_days, parse_day, to_day, DateRange};
pub use task::{StatusNormalizer, Task, TaskStatus};
pub use edge::{DateField, DependencyEdge, Lag, RelationType};
pub use graph::{DependencyGraph, EdgeContext, TaskSnapshot};
pub use violation::{Violation, ViolationKind};
pub use blocking::{blocking_flags, check_transition, is_blocking, BlockingFlag, EdgeRole, TransitionDecision};
pub use checker::{check_as_predecessor, check_as_successor, check_dates, check_project_bounds, validate_edit};
pub use resolver::{auto_fix, reschedule_chain, resolve, FixProposal, FixScope, DEFAULT_MAX_ITERATIONS};
pub use report::{ResolutionOptions, ViolationReport};
pub use shared::{ApplyOutcome, SharedGraph};
