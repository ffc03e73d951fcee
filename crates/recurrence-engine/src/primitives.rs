//! Calendar primitives: weekdays, month arithmetic, and nth-weekday positions.
//!
//! Everything here is timezone-free and works on `chrono::NaiveDate`.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, Month, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{RecurrenceError, Result};

/// A day of the week. Ordered Monday first, matching the iCalendar default
/// week start (`WKST=MO`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    /// Zero-based offset from Monday.
    pub fn days_from_monday(self) -> u32 {
        self as u32
    }

    /// Two-letter iCalendar code (`MO`, `TU`, ...).
    pub fn code(self) -> &'static str {
        match self {
            Weekday::Monday => "MO",
            Weekday::Tuesday => "TU",
            Weekday::Wednesday => "WE",
            Weekday::Thursday => "TH",
            Weekday::Friday => "FR",
            Weekday::Saturday => "SA",
            Weekday::Sunday => "SU",
        }
    }

    /// Parse a two-letter iCalendar code. Case-sensitive, as the provider
    /// always emits upper case.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|day| day.code() == code)
    }

    /// The weekday a date falls on.
    pub fn of(date: NaiveDate) -> Self {
        date.weekday().into()
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
            chrono::Weekday::Sun => Weekday::Sunday,
        }
    }
}

impl From<Weekday> for chrono::Weekday {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Monday => chrono::Weekday::Mon,
            Weekday::Tuesday => chrono::Weekday::Tue,
            Weekday::Wednesday => chrono::Weekday::Wed,
            Weekday::Thursday => chrono::Weekday::Thu,
            Weekday::Friday => chrono::Weekday::Fri,
            Weekday::Saturday => chrono::Weekday::Sat,
            Weekday::Sunday => chrono::Weekday::Sun,
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Weekday {
    type Err = RecurrenceError;

    /// Accepts iCalendar codes (`MO`) and full English names in any case.
    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_uppercase();
        if let Some(day) = Self::from_code(&upper) {
            return Ok(day);
        }
        Self::ALL
            .into_iter()
            .find(|day| format!("{day:?}").to_uppercase() == upper)
            .ok_or_else(|| RecurrenceError::invalid("weekday", format!("unknown weekday '{s}'")))
    }
}

/// Number of days in `month` (1-12) of `year`; 0 for an out-of-range month.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .and_then(|m| m.num_days(year))
        .map_or(0, u32::from)
}

/// The Monday on or before `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Absolute month counter: `year * 12 + (month - 1)`.
pub fn month_index(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}

/// Inverse of [`month_index`], returning `(year, month)` with a 1-based month.
/// Years beyond `i32` saturate, which no `NaiveDate` can hold.
pub fn month_from_index(index: i64) -> (i32, u32) {
    let year = index.div_euclid(12).clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
    (year, index.rem_euclid(12) as u32 + 1)
}

/// The nth occurrence of a weekday inside a month. Negative `nth` counts from
/// the end (`-1` is the last one).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeekdayPosition {
    nth: i8,
    weekday: Weekday,
}

impl WeekdayPosition {
    pub fn new(nth: i8, weekday: Weekday) -> Result<Self> {
        if nth == 0 || !(-5..=5).contains(&nth) {
            return Err(RecurrenceError::invalid(
                "nth",
                format!("must be between -5 and 5 excluding 0, got {nth}"),
            ));
        }
        Ok(Self { nth, weekday })
    }

    pub fn nth(&self) -> i8 {
        self.nth
    }

    pub fn weekday(&self) -> Weekday {
        self.weekday
    }

    /// The concrete date in `year`/`month`, or `None` when the month has fewer
    /// than `|nth|` of this weekday.
    pub fn resolve(&self, year: i32, month: u32) -> Option<NaiveDate> {
        let dim = i64::from(days_in_month(year, month));
        if dim == 0 {
            return None;
        }
        let target = i64::from(self.weekday.days_from_monday());
        let step = 7 * (i64::from(self.nth.unsigned_abs()) - 1);

        let day = if self.nth > 0 {
            let first = NaiveDate::from_ymd_opt(year, month, 1)?;
            let first_dow = i64::from(Weekday::of(first).days_from_monday());
            1 + (target - first_dow).rem_euclid(7) + step
        } else {
            let last = NaiveDate::from_ymd_opt(year, month, dim as u32)?;
            let last_dow = i64::from(Weekday::of(last).days_from_monday());
            dim - (last_dow - target).rem_euclid(7) - step
        };

        if day < 1 || day > dim {
            return None;
        }
        NaiveDate::from_ymd_opt(year, month, day as u32)
    }
}

impl fmt::Display for WeekdayPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.nth, self.weekday.code())
    }
}
