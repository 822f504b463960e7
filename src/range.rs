//! Closed date intervals used to scope expense queries and reports.

use serde::{Deserialize, Serialize};
use time::{Date, Duration};

/// A closed date interval: both `start` and `end` are included.
///
/// The interval is not validated; a range with `start > end` simply contains
/// no dates and produces empty query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// The first date in the interval.
    pub start: Date,
    /// The last date in the interval.
    pub end: Date,
}

impl DateRange {
    /// Create a date range spanning `start` to `end` inclusive.
    pub fn new(start: Date, end: Date) -> Self {
        Self { start, end }
    }

    /// Whether `date` falls within the interval.
    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }
}

/// The Monday beginning the week that contains `date`.
///
/// Weeks start on Monday, so a Monday maps to itself and a Sunday maps six
/// days back.
pub fn week_start(date: Date) -> Date {
    let weekday_number = date.weekday().number_from_monday() as i64;

    date - Duration::days(weekday_number - 1)
}
