//! Occurrence calculator -- projects a pattern from its anchor date and finds
//! the earliest occurrence after a reference date.
//!
//! Every candidate is derived from the anchor, never from the last completed
//! occurrence, so monthly and yearly rules stay locked to their day-of-month
//! or weekday position. Months (or years) that lack the requested day are
//! skipped, not clamped, matching RFC 5545 expansion.

use std::collections::BTreeSet;

use chrono::{Datelike, Duration, NaiveDate};
use tracing::trace;

use crate::primitives::{days_in_month, month_from_index, month_index, week_start, Weekday};
use crate::rule::{MonthlyMode, RecurrenceEnd, RecurrencePattern, RecurrenceState, YearlyMode};

/// The Gregorian calendar repeats every 400 years, so a month-based pattern
/// that has no valid candidate within 4800 periods never has one.
const MONTH_PERIOD_LIMIT: u32 = 400 * 12;
const YEAR_PERIOD_LIMIT: u32 = 400;

/// Earliest occurrence strictly after `after` (or on/after it when
/// `inclusive`). Returns `None` when the rule has ended: an `OnDate` limit is
/// passed, an `AfterOccurrences` budget is spent, or the pattern can never
/// produce another date.
pub fn next_occurrence(state: &RecurrenceState, after: NaiveDate, inclusive: bool) -> Option<NaiveDate> {
    debug_assert!(
        state.pattern().validate().is_ok(),
        "malformed recurrence pattern: {:?}",
        state.pattern()
    );

    if state.is_exhausted() {
        return None;
    }

    let lower = if inclusive { after } else { after.succ_opt()? };
    let lower = lower.max(state.anchor());
    let candidate = project(state.pattern(), state.anchor(), lower)?;

    match state.end() {
        RecurrenceEnd::OnDate(limit) if candidate > limit => {
            trace!(%candidate, %limit, "candidate past end date");
            None
        }
        _ => Some(candidate),
    }
}

/// The first occurrence of a fresh state, counting the anchor itself.
pub fn first_occurrence(state: &RecurrenceState) -> Option<NaiveDate> {
    next_occurrence(state, state.anchor(), true)
}

/// Iterate occurrences after `after`, honoring the end condition and any
/// remaining `AfterOccurrences` budget.
pub fn occurrences(state: &RecurrenceState, after: NaiveDate, inclusive: bool) -> Occurrences<'_> {
    let remaining = match state.end() {
        RecurrenceEnd::AfterOccurrences(n) => Some(n.saturating_sub(state.occurrence_count())),
        _ => None,
    };
    Occurrences {
        state,
        cursor: after,
        inclusive,
        remaining,
    }
}

/// Occurrences from the task's current due date onward.
pub fn upcoming(state: &RecurrenceState) -> Occurrences<'_> {
    match state.last_occurrence() {
        Some(last) => occurrences(state, last, false),
        None => occurrences(state, state.anchor(), true),
    }
}

/// Iterator returned by [`occurrences`] and [`upcoming`].
#[derive(Debug, Clone)]
pub struct Occurrences<'a> {
    state: &'a RecurrenceState,
    cursor: NaiveDate,
    inclusive: bool,
    remaining: Option<u32>,
}

impl Iterator for Occurrences<'_> {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        if self.remaining == Some(0) {
            return None;
        }
        let date = next_occurrence(self.state, self.cursor, self.inclusive)?;
        self.cursor = date;
        self.inclusive = false;
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= 1;
        }
        Some(date)
    }
}

/// Smallest pattern date that is `>= lower`. `lower` is never before the anchor.
fn project(pattern: &RecurrencePattern, anchor: NaiveDate, lower: NaiveDate) -> Option<NaiveDate> {
    match pattern {
        RecurrencePattern::Daily { interval } => next_daily(anchor, *interval, lower),
        RecurrencePattern::Weekly { interval, days } => next_weekly(anchor, *interval, days, lower),
        RecurrencePattern::Monthly { interval, mode } => {
            let first = month_index(anchor);
            next_in_periods(
                first,
                month_index(lower),
                *interval,
                MONTH_PERIOD_LIMIT,
                lower,
                |index| {
                    let (year, month) = month_from_index(index);
                    let date = match mode {
                        MonthlyMode::DayOfMonth(day) => day_in_month(year, month, *day),
                        MonthlyMode::NthWeekday(position) => position.resolve(year, month),
                    };
                    if date.is_none() {
                        trace!(year, month, "no occurrence this month, skipping");
                    }
                    date
                },
            )
        }
        RecurrencePattern::Yearly {
            interval,
            month,
            mode,
        } => next_in_periods(
            i64::from(anchor.year()),
            i64::from(lower.year()),
            *interval,
            YEAR_PERIOD_LIMIT,
            lower,
            |year| {
                let year = i32::try_from(year).ok()?;
                let date = match mode {
                    YearlyMode::SpecificDate(day) => day_in_month(year, *month, *day),
                    YearlyMode::NthWeekdayOfMonth(position) => position.resolve(year, *month),
                };
                if date.is_none() {
                    trace!(year, month, "no occurrence this year, skipping");
                }
                date
            },
        ),
    }
}

fn next_daily(anchor: NaiveDate, interval: u32, lower: NaiveDate) -> Option<NaiveDate> {
    let step = i64::from(interval);
    let offset = (lower - anchor).num_days();
    let periods = (offset + step - 1).div_euclid(step);
    anchor.checked_add_signed(Duration::days(periods * step))
}

fn next_weekly(
    anchor: NaiveDate,
    interval: u32,
    days: &BTreeSet<Weekday>,
    lower: NaiveDate,
) -> Option<NaiveDate> {
    let base = week_start(anchor);
    let step = i64::from(interval);
    let weeks = (lower - base).num_days().div_euclid(7);
    let mut block = weeks.div_euclid(step) * step;

    // The block holding `lower` may have no day left; the next one always does.
    for _ in 0..2 {
        let start = base.checked_add_signed(Duration::weeks(block))?;
        for day in days {
            let date = start.checked_add_signed(Duration::days(i64::from(day.days_from_monday())))?;
            if date >= lower {
                return Some(date);
            }
        }
        block += step;
    }
    None
}

/// Walk the period sequence `first + k * interval` starting at the period
/// holding `lower`, returning the first resolved date on or after `lower`.
fn next_in_periods(
    first: i64,
    lower_period: i64,
    interval: u32,
    limit: u32,
    lower: NaiveDate,
    resolve: impl Fn(i64) -> Option<NaiveDate>,
) -> Option<NaiveDate> {
    let step = i64::from(interval);
    let mut k = (lower_period - first).div_euclid(step);
    for _ in 0..limit {
        if let Some(date) = resolve(first + k * step) {
            if date >= lower {
                return Some(date);
            }
        }
        k += 1;
    }
    None
}

fn day_in_month(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    if day > days_in_month(year, month) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}
