//! Deterministic calendar derivation for the time dimension.
//!
//! The time dimension's surrogate key and every calendar attribute are pure
//! functions of the date, so resolving the same date twice can never
//! produce divergent rows.

use chrono::{Datelike, NaiveDate};
use starlift_shared::types::DateKey;

/// Fully derived time-dimension row for one calendar date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarDay {
    /// Surrogate key (`YYYYMMDD`).
    pub key: DateKey,
    /// The calendar date itself (the business key).
    pub date: NaiveDate,
    /// Calendar year.
    pub year: i32,
    /// Calendar month (1-12).
    pub month: u32,
    /// Day of month (1-31).
    pub day: u32,
    /// Calendar quarter (1-4).
    pub quarter: u32,
    /// English month name.
    pub month_name: &'static str,
}

impl CalendarDay {
    /// Derives the full calendar tuple for a date.
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        let month = date.month();
        Self {
            key: DateKey::from_date(date),
            date,
            year: date.year(),
            month,
            day: date.day(),
            quarter: quarter_of(month),
            month_name: month_name(month),
        }
    }

    /// Derives the calendar tuple for the first day of a reporting month.
    ///
    /// Returns `None` for an invalid year/month combination.
    #[must_use]
    pub fn first_of_month(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Self::from_date)
    }
}

/// Calendar quarter (1-4) for a month (1-12).
#[must_use]
pub const fn quarter_of(month: u32) -> u32 {
    (month - 1) / 3 + 1
}

/// English month name for a month (1-12).
#[must_use]
pub const fn month_name(month: u32) -> &'static str {
    match month {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        12 => "December",
        _ => "Unknown",
    }
}
