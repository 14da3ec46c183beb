//! Task domain model
//!
//! The engine only needs the scheduling fields of a task: its status and its
//! start/deadline days. Everything else belongs to the caller's task store.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use super::error::ScheduleError;
use super::id::TaskId;
use super::temporal::DateRange;

/// Status of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "todo")]
    ToDo,
    #[serde(rename = "doing")]
    Doing,
    #[serde(rename = "done")]
    Done,
}

impl TaskStatus {
    /// Returns true if this status represents completion
    pub fn is_complete(&self) -> bool {
        matches!(self, TaskStatus::Done)
    }

    /// Returns true once work has begun (doing or done)
    pub fn is_started(&self) -> bool {
        matches!(self, TaskStatus::Doing | TaskStatus::Done)
    }

    /// Returns true if this task is not yet started
    pub fn is_pending(&self) -> bool {
        matches!(self, TaskStatus::ToDo)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::ToDo => "todo",
            TaskStatus::Doing => "doing",
            TaskStatus::Done => "done",
        }
    }

    /// Human-facing label
    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::ToDo => "To Do",
            TaskStatus::Doing => "Doing",
            TaskStatus::Done => "Done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StatusNormalizer::default().normalize(s)
    }
}

/// Maps external status strings onto [`TaskStatus`]
///
/// This is the single place where raw status strings are interpreted.
/// Lookups ignore case and treat `-`, `_` and spaces alike.
#[derive(Debug, Clone, Default)]
pub struct StatusNormalizer {
    custom: HashMap<String, TaskStatus>,
}

impl StatusNormalizer {
    /// Creates a normalizer that also knows the given custom states
    pub fn with_aliases<I, S>(aliases: I) -> Self
    where
        I: IntoIterator<Item = (S, TaskStatus)>,
        S: AsRef<str>,
    {
        let custom = aliases
            .into_iter()
            .map(|(name, status)| (canonical_key(name.as_ref()), status))
            .collect();
        Self { custom }
    }

    /// Normalizes an external status string
    pub fn normalize(&self, raw: &str) -> Result<TaskStatus, ScheduleError> {
        let key = canonical_key(raw);
        if let Some(status) = self.custom.get(&key) {
            return Ok(*status);
        }

        match key.as_str() {
            "todo" | "to do" | "backlog" | "open" | "new" | "pending" | "not started" => {
                Ok(TaskStatus::ToDo)
            }
            "doing" | "in progress" | "inprogress" | "started" | "active" | "wip" => {
                Ok(TaskStatus::Doing)
            }
            "done" | "complete" | "completed" | "closed" | "finished" | "resolved" => {
                Ok(TaskStatus::Done)
            }
            _ => Err(ScheduleError::InvalidStatus(raw.trim().to_string())),
        }
    }
}

fn canonical_key(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// A schedulable task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: TaskId,

    /// Human-readable title
    pub title: String,

    /// Current status
    #[serde(default)]
    pub status: TaskStatus,

    /// First day of work
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,

    /// Last day of work
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a new unscheduled task with the given ID and title
    pub fn new(id: TaskId, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: title.into(),
            status: TaskStatus::ToDo,
            start_date: None,
            deadline: None,
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder-style helper to set both dates
    pub fn with_dates(mut self, dates: DateRange) -> Self {
        self.start_date = Some(dates.start());
        self.deadline = Some(dates.end());
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Returns the task's dates when both are set
    pub fn dates(&self) -> Option<DateRange> {
        match (self.start_date, self.deadline) {
            (Some(start), Some(end)) => DateRange::new(start, end).ok(),
            _ => None,
        }
    }

    /// Checks that a deadline is never before the start
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if let (Some(start), Some(end)) = (self.start_date, self.deadline) {
            DateRange::new(start, end)?;
        }
        Ok(())
    }

    /// Replaces both dates
    pub fn set_dates(&mut self, dates: DateRange) {
        self.start_date = Some(dates.start());
        self.deadline = Some(dates.end());
        self.updated_at = Utc::now();
    }

    pub fn set_status(&mut self, status: TaskStatus) {
        if self.status != status {
            self.status = status;
            self.updated_at = Utc::now();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn make_task(id: &str) -> Task {
        Task::new(id.parse().unwrap(), format!("Task {}", id))
    }

    #[test]
    fn new_task_is_todo_and_unscheduled() {
        let task = make_task("a");
        assert_eq!(task.status, TaskStatus::ToDo);
        assert!(task.status.is_pending());
        assert!(task.dates().is_none());
    }

    #[test]
    fn status_predicates() {
        assert!(!TaskStatus::ToDo.is_started());
        assert!(TaskStatus::Doing.is_started());
        assert!(TaskStatus::Done.is_started());
        assert!(TaskStatus::Done.is_complete());
        assert!(!TaskStatus::Doing.is_complete());
    }

    #[test]
    fn normalizes_builtin_spellings() {
        let n = StatusNormalizer::default();
        assert_eq!(n.normalize("To Do").unwrap(), TaskStatus::ToDo);
        assert_eq!(n.normalize("TODO").unwrap(), TaskStatus::ToDo);
        assert_eq!(n.normalize("in_progress").unwrap(), TaskStatus::Doing);
        assert_eq!(n.normalize("In-Progress").unwrap(), TaskStatus::Doing);
        assert_eq!(n.normalize("Completed").unwrap(), TaskStatus::Done);
        assert_eq!("doing".parse::<TaskStatus>().unwrap(), TaskStatus::Doing);
    }

    #[test]
    fn unknown_status_is_rejected() {
        let err = StatusNormalizer::default().normalize("Waiting for QA").unwrap_err();
        assert_eq!(err, ScheduleError::InvalidStatus("Waiting for QA".to_string()));
    }

    #[test]
    fn custom_aliases_take_precedence() {
        let n = StatusNormalizer::with_aliases([("Waiting for QA", TaskStatus::Doing)]);
        assert_eq!(n.normalize("waiting_for_qa").unwrap(), TaskStatus::Doing);
        assert_eq!(n.normalize("done").unwrap(), TaskStatus::Done);
    }

    #[test]
    fn dates_require_both_ends() {
        let mut task = make_task("a");
        task.start_date = Some(d("2025-01-01"));
        assert!(task.dates().is_none());

        task.deadline = Some(d("2025-01-03"));
        assert_eq!(task.dates().unwrap().duration_days(), 2);
    }

    #[test]
    fn validate_rejects_inverted_dates() {
        let mut task = make_task("a");
        task.start_date = Some(d("2025-01-05"));
        task.deadline = Some(d("2025-01-01"));
        assert!(matches!(
            task.validate(),
            Err(ScheduleError::InvalidDateRange { .. })
        ));
    }

    #[test]
    fn serde_roundtrip_keeps_status_names() {
        let task = make_task("a")
            .with_status(TaskStatus::Doing)
            .with_dates(DateRange::new(d("2025-01-01"), d("2025-01-04")).unwrap());

        let json = serde_json::to_string(&task).unwrap();
        assert!(json.contains("\"status\":\"doing\""));
        assert!(json.contains("\"start_date\":\"2025-01-01\""));

        let parsed: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, task);
    }

    #[test]
    fn updated_at_changes_on_status_change() {
        let mut task = make_task("a");
        let before = task.updated_at;

        std::thread::sleep(std::time::Duration::from_millis(10));
        task.set_status(TaskStatus::Doing);

        assert!(task.updated_at > before);
    }
}
