//! Structured violations handed back to callers

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::edge::RelationType;
use super::id::{EdgeId, TaskId};
use super::temporal::DateRange;

/// What kind of rule was broken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// A dependency edge is not satisfied (dates or status)
    Dependency,
    /// Dates fall outside the owning project's range
    DateValidation,
}

/// A single broken constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,

    /// Task the violation was computed for
    pub task_id: TaskId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_id: Option<EdgeId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<RelationType>,

    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_start_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_deadline: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_start_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_deadline: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_mandatory: Option<bool>,
}

impl Violation {
    /// Starts a dependency violation for `task_id`
    pub fn dependency(task_id: TaskId, message: impl Into<String>) -> Self {
        Self::new(ViolationKind::Dependency, task_id, message)
    }

    /// Starts a date-validation violation for `task_id`
    pub fn date_validation(task_id: TaskId, message: impl Into<String>) -> Self {
        Self::new(ViolationKind::DateValidation, task_id, message)
    }

    fn new(kind: ViolationKind, task_id: TaskId, message: impl Into<String>) -> Self {
        Self {
            kind,
            task_id,
            edge_id: None,
            relation: None,
            message: message.into(),
            suggestion: None,
            current_start_date: None,
            current_deadline: None,
            required_start_date: None,
            required_deadline: None,
            is_mandatory: None,
        }
    }

    pub fn on_edge(mut self, edge_id: EdgeId, relation: RelationType, mandatory: bool) -> Self {
        self.edge_id = Some(edge_id);
        self.relation = Some(relation);
        self.is_mandatory = Some(mandatory);
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_current(mut self, dates: DateRange) -> Self {
        self.current_start_date = Some(dates.start());
        self.current_deadline = Some(dates.end());
        self
    }

    pub fn requiring_start(mut self, date: NaiveDate) -> Self {
        self.required_start_date = Some(date);
        self
    }

    pub fn requiring_deadline(mut self, date: NaiveDate) -> Self {
        self.required_deadline = Some(date);
        self
    }

    /// Returns true for mandatory dependency violations
    pub fn is_mandatory(&self) -> bool {
        self.is_mandatory.unwrap_or(false)
    }

    /// Returns the task's current dates when both are known
    pub fn current_dates(&self) -> Option<DateRange> {
        match (self.current_start_date, self.current_deadline) {
            (Some(start), Some(end)) => DateRange::new(start, end).ok(),
            _ => None,
        }
    }

    /// Returns true if the violation carries a date the resolver can aim for
    pub fn has_date_remedy(&self) -> bool {
        self.required_start_date.is_some() || self.required_deadline.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_shape_uses_snake_case() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 11).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let violation = Violation::dependency("b".parse().unwrap(), "late")
            .on_edge("d-1".parse().unwrap(), RelationType::FinishToStart, true)
            .with_current(DateRange::new(start, end).unwrap())
            .requiring_start(NaiveDate::from_ymd_opt(2025, 1, 12).unwrap())
            .with_suggestion("move it");

        let json = serde_json::to_value(&violation).unwrap();
        assert_eq!(json["kind"], "dependency");
        assert_eq!(json["edge_id"], "d-1");
        assert_eq!(json["relation"], "FS");
        assert_eq!(json["current_start_date"], "2025-01-11");
        assert_eq!(json["current_deadline"], "2025-01-15");
        assert_eq!(json["required_start_date"], "2025-01-12");
        assert_eq!(json["is_mandatory"], true);
        assert!(json.get("required_deadline").is_none());
    }

    #[test]
    fn date_validation_is_not_mandatory() {
        let violation = Violation::date_validation("a".parse().unwrap(), "outside");
        assert_eq!(violation.kind, ViolationKind::DateValidation);
        assert!(!violation.is_mandatory());
        assert!(!violation.has_date_remedy());
        assert!(violation.current_dates().is_none());
    }
}
