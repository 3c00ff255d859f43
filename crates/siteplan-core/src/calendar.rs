//! Whole-day date arithmetic and working calendars.
//!
//! All scheduling math runs on integer day numbers relative to a project
//! origin. Dates are `NaiveDate`, so there is no timezone or DST to drift.

use chrono::{Datelike, NaiveDate, TimeDelta, Weekday};
use serde::{Deserialize, Serialize};

/// Integer day number relative to a [`DayAxis`] origin.
pub type Day = i64;

/// Maps calendar dates onto integer day numbers and back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayAxis {
    origin: NaiveDate,
}

impl DayAxis {
    pub fn new(origin: NaiveDate) -> Self {
        Self { origin }
    }

    pub fn origin(&self) -> NaiveDate {
        self.origin
    }

    pub fn day_of(&self, date: NaiveDate) -> Day {
        (date - self.origin).num_days()
    }

    pub fn date_of(&self, day: Day) -> NaiveDate {
        add_days(self.origin, day)
    }
}

/// `date + days`, or `None` when the result falls outside the chrono date range.
pub fn checked_add_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    TimeDelta::try_days(days).and_then(|delta| date.checked_add_signed(delta))
}

/// `date + days`, saturating at the chrono date range limits.
pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    checked_add_days(date, days).unwrap_or(if days < 0 { NaiveDate::MIN } else { NaiveDate::MAX })
}

/// Whole days from `from` to `to` (negative if `to` is earlier).
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Working weekdays plus explicit holidays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingCalendar {
    #[serde(default = "default_working_days")]
    pub working_days: Vec<Weekday>,
    #[serde(default)]
    pub holidays: Vec<NaiveDate>,
}

fn default_working_days() -> Vec<Weekday> {
    vec![
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
    ]
}

impl Default for WorkingCalendar {
    fn default() -> Self {
        Self {
            working_days: default_working_days(),
            holidays: Vec::new(),
        }
    }
}

impl WorkingCalendar {
    /// A calendar on which every day is worked.
    pub fn seven_day() -> Self {
        Self {
            working_days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
                Weekday::Sat,
                Weekday::Sun,
            ],
            holidays: Vec::new(),
        }
    }

    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        self.working_days.contains(&date.weekday()) && !self.holidays.contains(&date)
    }

    /// First working day on or after `date`, giving up after `limit` days.
    pub fn next_working_day(&self, date: NaiveDate, limit: i64) -> Option<NaiveDate> {
        (0..=limit)
            .map(|offset| add_days(date, offset))
            .find(|d| self.is_working_day(*d))
    }
}
