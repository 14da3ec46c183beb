//! Typed dependency edges between tasks
//!
//! An edge points from a predecessor to a successor. Its relation says which
//! end of each task is linked, and its lag shifts the required date: positive
//! values delay the successor, negative values (leads) let it overlap.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::ScheduleError;
use super::id::{EdgeId, TaskId};
use super::temporal::{add_days, DateRange};

/// Which end of a task a relation refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateField {
    Start,
    Deadline,
}

impl DateField {
    pub fn label(&self) -> &'static str {
        match self {
            DateField::Start => "start",
            DateField::Deadline => "finish",
        }
    }

    /// Picks the matching day out of a range
    pub fn of(&self, range: &DateRange) -> NaiveDate {
        match self {
            DateField::Start => range.start(),
            DateField::Deadline => range.end(),
        }
    }
}

/// Relation between the predecessor and the successor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RelationType {
    /// Successor starts after the predecessor finishes
    FinishToStart,
    /// Successor starts after the predecessor starts
    StartToStart,
    /// Successor finishes after the predecessor finishes
    FinishToFinish,
    /// Successor finishes after the predecessor starts
    StartToFinish,
}

impl RelationType {
    pub const ALL: [RelationType; 4] = [
        RelationType::FinishToStart,
        RelationType::StartToStart,
        RelationType::FinishToFinish,
        RelationType::StartToFinish,
    ];

    /// Two-letter code (`FS`, `SS`, `FF`, `SF`)
    pub fn code(&self) -> &'static str {
        match self {
            RelationType::FinishToStart => "FS",
            RelationType::StartToStart => "SS",
            RelationType::FinishToFinish => "FF",
            RelationType::StartToFinish => "SF",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RelationType::FinishToStart => "Finish-to-Start",
            RelationType::StartToStart => "Start-to-Start",
            RelationType::FinishToFinish => "Finish-to-Finish",
            RelationType::StartToFinish => "Start-to-Finish",
        }
    }

    /// The predecessor's date the requirement is computed from
    pub fn predecessor_field(&self) -> DateField {
        match self {
            RelationType::FinishToStart | RelationType::FinishToFinish => DateField::Deadline,
            RelationType::StartToStart | RelationType::StartToFinish => DateField::Start,
        }
    }

    /// The successor's date the requirement constrains
    pub fn successor_field(&self) -> DateField {
        match self {
            RelationType::FinishToStart | RelationType::StartToStart => DateField::Start,
            RelationType::FinishToFinish | RelationType::StartToFinish => DateField::Deadline,
        }
    }

    /// Returns true if the relation gates when the successor may start
    pub fn gates_start(&self) -> bool {
        self.successor_field() == DateField::Start
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for RelationType {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('_', "-").as_str() {
            "FS" | "FINISH-TO-START" => Ok(RelationType::FinishToStart),
            "SS" | "START-TO-START" => Ok(RelationType::StartToStart),
            "FF" | "FINISH-TO-FINISH" => Ok(RelationType::FinishToFinish),
            "SF" | "START-TO-FINISH" => Ok(RelationType::StartToFinish),
            _ => Err(ScheduleError::InvalidRelation(s.to_string())),
        }
    }
}

impl TryFrom<String> for RelationType {
    type Error = ScheduleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RelationType> for String {
    fn from(relation: RelationType) -> Self {
        relation.code().to_string()
    }
}

/// Signed day offset, bounded to one year either way
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Lag(i64);

impl Lag {
    pub const MIN: i64 = -365;
    pub const MAX: i64 = 365;

    pub fn new(days: i64) -> Result<Self, ScheduleError> {
        if !(Self::MIN..=Self::MAX).contains(&days) {
            return Err(ScheduleError::InvalidLag(days));
        }
        Ok(Self(days))
    }

    pub fn days(&self) -> i64 {
        self.0
    }

    /// Returns true for negative offsets (overlap allowed)
    pub fn is_lead(&self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for Lag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+} days", self.0)
    }
}

impl TryFrom<i64> for Lag {
    type Error = ScheduleError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Lag::new(value)
    }
}

impl From<Lag> for i64 {
    fn from(lag: Lag) -> Self {
        lag.0
    }
}

/// A directed dependency: `predecessor` -> `successor`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub id: EdgeId,

    pub predecessor: TaskId,

    pub successor: TaskId,

    #[serde(rename = "type")]
    pub relation: RelationType,

    #[serde(default)]
    pub lag: Lag,

    /// Mandatory edges may only be violated by an explicit override
    #[serde(default = "default_mandatory")]
    pub mandatory: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

fn default_mandatory() -> bool {
    true
}

impl DependencyEdge {
    /// Creates a mandatory edge with a generated ID
    pub fn new(predecessor: TaskId, successor: TaskId, relation: RelationType, lag: Lag) -> Self {
        Self::with_id(
            EdgeId::generate(&predecessor, &successor, Utc::now()),
            predecessor,
            successor,
            relation,
            lag,
        )
    }

    pub fn with_id(
        id: EdgeId,
        predecessor: TaskId,
        successor: TaskId,
        relation: RelationType,
        lag: Lag,
    ) -> Self {
        Self {
            id,
            predecessor,
            successor,
            relation,
            lag,
            mandatory: true,
            note: None,
        }
    }

    /// Builds an edge from unvalidated input
    pub fn parse(
        predecessor: TaskId,
        successor: TaskId,
        relation: &str,
        lag: i64,
        mandatory: bool,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, ScheduleError> {
        let relation: RelationType = relation.parse()?;
        let lag = Lag::new(lag)?;
        let id = EdgeId::generate(&predecessor, &successor, timestamp);
        Ok(Self::with_id(id, predecessor, successor, relation, lag).with_mandatory(mandatory))
    }

    pub fn with_mandatory(mut self, mandatory: bool) -> Self {
        self.mandatory = mandatory;
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// The earliest allowed successor date, given the predecessor's dates
    pub fn required_successor_date(&self, predecessor: &DateRange) -> NaiveDate {
        add_days(self.relation.predecessor_field().of(predecessor), self.lag.days())
    }

    /// The latest allowed predecessor date, given the successor's dates
    pub fn latest_predecessor_date(&self, successor: &DateRange) -> NaiveDate {
        add_days(self.relation.successor_field().of(successor), -self.lag.days())
    }

    /// Returns true if the pair of ranges satisfies this edge
    pub fn is_satisfied(&self, predecessor: &DateRange, successor: &DateRange) -> bool {
        self.relation.successor_field().of(successor) >= self.required_successor_date(predecessor)
    }
}
