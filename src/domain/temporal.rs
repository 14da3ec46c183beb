//! Calendar-day arithmetic
//!
//! All scheduling math works on naive calendar days. Time-of-day components
//! are truncated at the boundary and no timezone conversion is performed, so
//! relations never drift by a day.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::ScheduleError;

/// Signed number of days from `a` to `b`
pub fn days_between(a: NaiveDate, b: NaiveDate) -> i64 {
    (b - a).num_days()
}

/// Offsets a date by `n` days, saturating at the representable calendar bounds
pub fn add_days(date: NaiveDate, n: i64) -> NaiveDate {
    date.checked_add_signed(Duration::days(n)).unwrap_or(if n < 0 {
        NaiveDate::MIN
    } else {
        NaiveDate::MAX
    })
}

/// Number of days a task spans from start to end
///
/// Inputs are whole days, so this is already the ceiling of the
/// millisecond difference divided by a day.
pub fn duration_days(start: NaiveDate, end: NaiveDate) -> i64 {
    days_between(start, end)
}

/// Number of calendar days covered by the closed interval `[start, end]`
pub fn inclusive_days(start: NaiveDate, end: NaiveDate) -> i64 {
    duration_days(start, end) + 1
}

/// Truncates a timestamp to its calendar day
pub fn to_day(timestamp: DateTime<Utc>) -> NaiveDate {
    timestamp.date_naive()
}

/// Parses `YYYY-MM-DD` or an RFC 3339 timestamp into a calendar day
pub fn parse_day(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(day) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(day);
    }
    // Keep the written calendar day; do not convert to UTC first
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|ts| ts.naive_local().date())
}

/// A validated `[start, end]` pair of calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDateRange")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct RawDateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = ScheduleError;

    fn try_from(raw: RawDateRange) -> Result<Self, Self::Error> {
        DateRange::new(raw.start, raw.end)
    }
}

impl DateRange {
    /// Creates a range, failing when `end` is before `start`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ScheduleError> {
        if end < start {
            return Err(ScheduleError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn duration_days(&self) -> i64 {
        duration_days(self.start, self.end)
    }

    /// Moves the range so it starts on `start`, keeping its duration
    pub fn shifted_to_start(&self, start: NaiveDate) -> Self {
        Self {
            start,
            end: add_days(start, self.duration_days()),
        }
    }

    /// Moves the range so it ends on `end`, keeping its duration
    pub fn shifted_to_end(&self, end: NaiveDate) -> Self {
        Self {
            start: add_days(end, -self.duration_days()),
            end,
        }
    }

    /// Returns true if `other` lies entirely within this range
    pub fn contains_range(&self, other: &DateRange) -> bool {
        other.start >= self.start && other.end <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} .. {}", self.start, self.end)
    }
}
