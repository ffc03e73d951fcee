//! Recurrence rule model -- the closed set of repetition patterns, termination
//! conditions, and the per-task progress state.
//!
//! Canonical types are sum types; the loose "shape-by-field-presence" input
//! value is [`PatternSpec`] / [`EndSpec`], which convert into the canonical
//! types with field-level validation errors. Serde goes through those input
//! types, so a deserialized rule is always a validated rule.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calculator;
use crate::error::{RecurrenceError, Result};
use crate::primitives::{Weekday, WeekdayPosition};

/// The pattern tag, named after the iCalendar `FREQ` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Yearly => "YEARLY",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = RecurrenceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "DAILY" => Ok(Frequency::Daily),
            "WEEKLY" => Ok(Frequency::Weekly),
            "MONTHLY" => Ok(Frequency::Monthly),
            "YEARLY" => Ok(Frequency::Yearly),
            other => Err(RecurrenceError::invalid(
                "pattern.frequency",
                format!("unknown frequency '{other}'"),
            )),
        }
    }
}

/// How a monthly rule picks its day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonthlyMode {
    /// Day of month, 1-31. Months without that day are skipped.
    DayOfMonth(u32),
    NthWeekday(WeekdayPosition),
}

/// How a yearly rule picks its day inside the rule's month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum YearlyMode {
    SpecificDate(u32),
    NthWeekdayOfMonth(WeekdayPosition),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "PatternSpec", into = "PatternSpec")]
pub enum RecurrencePattern {
    Daily {
        interval: u32,
    },
    Weekly {
        interval: u32,
        days: BTreeSet<Weekday>,
    },
    Monthly {
        interval: u32,
        mode: MonthlyMode,
    },
    Yearly {
        interval: u32,
        month: u32,
        mode: YearlyMode,
    },
}

impl RecurrencePattern {
    pub fn daily(interval: u32) -> Result<Self> {
        Self::Daily { interval }.validated()
    }

    pub fn weekly(interval: u32, days: impl IntoIterator<Item = Weekday>) -> Result<Self> {
        Self::Weekly {
            interval,
            days: days.into_iter().collect(),
        }
        .validated()
    }

    pub fn monthly_on_day(interval: u32, day: u32) -> Result<Self> {
        Self::Monthly {
            interval,
            mode: MonthlyMode::DayOfMonth(day),
        }
        .validated()
    }

    pub fn monthly_on_nth(interval: u32, nth: i8, weekday: Weekday) -> Result<Self> {
        let position = WeekdayPosition::new(nth, weekday).map_err(|e| e.within("pattern"))?;
        Self::Monthly {
            interval,
            mode: MonthlyMode::NthWeekday(position),
        }
        .validated()
    }

    pub fn yearly_on_date(interval: u32, month: u32, day: u32) -> Result<Self> {
        Self::Yearly {
            interval,
            month,
            mode: YearlyMode::SpecificDate(day),
        }
        .validated()
    }

    pub fn yearly_on_nth(interval: u32, month: u32, nth: i8, weekday: Weekday) -> Result<Self> {
        let position = WeekdayPosition::new(nth, weekday).map_err(|e| e.within("pattern"))?;
        Self::Yearly {
            interval,
            month,
            mode: YearlyMode::NthWeekdayOfMonth(position),
        }
        .validated()
    }

    pub fn frequency(&self) -> Frequency {
        match self {
            Self::Daily { .. } => Frequency::Daily,
            Self::Weekly { .. } => Frequency::Weekly,
            Self::Monthly { .. } => Frequency::Monthly,
            Self::Yearly { .. } => Frequency::Yearly,
        }
    }

    pub fn interval(&self) -> u32 {
        match self {
            Self::Daily { interval }
            | Self::Weekly { interval, .. }
            | Self::Monthly { interval, .. }
            | Self::Yearly { interval, .. } => *interval,
        }
    }

    /// Check every invariant of the canonical shape.
    pub fn validate(&self) -> Result<()> {
        if self.interval() < 1 {
            return Err(RecurrenceError::invalid("pattern.interval", "must be at least 1"));
        }
        match self {
            Self::Daily { .. } => Ok(()),
            Self::Weekly { days, .. } => {
                if days.is_empty() {
                    return Err(RecurrenceError::invalid(
                        "pattern.days",
                        "weekly rules need at least one weekday",
                    ));
                }
                Ok(())
            }
            Self::Monthly { mode, .. } => match mode {
                MonthlyMode::DayOfMonth(day) => check_day(*day),
                MonthlyMode::NthWeekday(_) => Ok(()),
            },
            Self::Yearly { month, mode, .. } => {
                if !(1..=12).contains(month) {
                    return Err(RecurrenceError::invalid(
                        "pattern.month",
                        format!("must be between 1 and 12, got {month}"),
                    ));
                }
                match mode {
                    YearlyMode::SpecificDate(day) => check_day(*day),
                    YearlyMode::NthWeekdayOfMonth(_) => Ok(()),
                }
            }
        }
    }

    fn validated(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }
}

fn check_day(day: u32) -> Result<()> {
    if !(1..=31).contains(&day) {
        return Err(RecurrenceError::invalid(
            "pattern.day",
            format!("must be between 1 and 31, got {day}"),
        ));
    }
    Ok(())
}

/// When a recurrence stops generating occurrences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "EndSpec", into = "EndSpec")]
pub enum RecurrenceEnd {
    #[default]
    Never,
    AfterOccurrences(u32),
    /// Last permitted occurrence date, inclusive.
    OnDate(NaiveDate),
}

impl RecurrenceEnd {
    pub fn after(count: u32) -> Result<Self> {
        let end = Self::AfterOccurrences(count);
        end.validate()?;
        Ok(end)
    }

    pub fn on(date: NaiveDate) -> Self {
        Self::OnDate(date)
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::AfterOccurrences(0) => {
                Err(RecurrenceError::invalid("end.count", "must be at least 1"))
            }
            _ => Ok(()),
        }
    }
}

/// A pattern plus its termination condition: the unit the codec speaks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub pattern: RecurrencePattern,
    #[serde(default)]
    pub end: RecurrenceEnd,
}

impl RecurrenceRule {
    pub fn new(pattern: RecurrencePattern, end: RecurrenceEnd) -> Result<Self> {
        pattern.validate()?;
        end.validate()?;
        Ok(Self { pattern, end })
    }

    pub fn forever(pattern: RecurrencePattern) -> Self {
        Self {
            pattern,
            end: RecurrenceEnd::Never,
        }
    }
}

/// Per-task recurrence progress. The anchor is fixed at creation; only the
/// advancement engine moves `occurrence_count` and `last_occurrence`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecurrenceState {
    rule: RecurrenceRule,
    anchor: NaiveDate,
    #[serde(default)]
    occurrence_count: u32,
    #[serde(default)]
    last_occurrence: Option<NaiveDate>,
}

impl RecurrenceState {
    pub fn new(rule: RecurrenceRule, anchor: NaiveDate) -> Self {
        Self {
            rule,
            anchor,
            occurrence_count: 0,
            last_occurrence: None,
        }
    }

    /// Rebuild a state loaded from storage.
    pub fn restore(
        rule: RecurrenceRule,
        anchor: NaiveDate,
        occurrence_count: u32,
        last_occurrence: Option<NaiveDate>,
    ) -> Self {
        Self {
            rule,
            anchor,
            occurrence_count,
            last_occurrence,
        }
    }

    pub fn rule(&self) -> &RecurrenceRule {
        &self.rule
    }

    pub fn pattern(&self) -> &RecurrencePattern {
        &self.rule.pattern
    }

    pub fn end(&self) -> RecurrenceEnd {
        self.rule.end
    }

    pub fn anchor(&self) -> NaiveDate {
        self.anchor
    }

    pub fn occurrence_count(&self) -> u32 {
        self.occurrence_count
    }

    pub fn last_occurrence(&self) -> Option<NaiveDate> {
        self.last_occurrence
    }

    /// True once an `AfterOccurrences` budget is used up.
    pub fn is_exhausted(&self) -> bool {
        matches!(self.rule.end, RecurrenceEnd::AfterOccurrences(n) if self.occurrence_count >= n)
    }

    /// The date the task is currently due: the first occurrence on or after
    /// the anchor when nothing has been completed, otherwise the first one
    /// strictly after the last completed occurrence.
    pub fn next_due(&self) -> Option<NaiveDate> {
        match self.last_occurrence {
            Some(last) => calculator::next_occurrence(self, last, false),
            None => calculator::first_occurrence(self),
        }
    }

    pub(crate) fn record_completion(&mut self, occurrence: NaiveDate) {
        self.occurrence_count = self.occurrence_count.saturating_add(1);
        self.last_occurrence = Some(occurrence);
    }
}

// ---------------------------------------------------------------------------
// Plain structured input
// ---------------------------------------------------------------------------

/// Loose input shape for a pattern, as received from forms or JSON. Which
/// mode applies is decided by which optional fields are present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSpec {
    pub frequency: Frequency,
    #[serde(default = "default_interval")]
    pub interval: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub days: Vec<Weekday>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nth: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekday: Option<Weekday>,
}

fn default_interval() -> i64 {
    1
}

impl PatternSpec {
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            interval: 1,
            days: Vec::new(),
            month: None,
            day: None,
            nth: None,
            weekday: None,
        }
    }

    fn reject(&self, present: bool, field: &str) -> Result<()> {
        if present {
            return Err(RecurrenceError::invalid(
                format!("pattern.{field}"),
                format!("not allowed for {} rules", self.frequency.as_str().to_lowercase()),
            ));
        }
        Ok(())
    }

    fn interval(&self) -> Result<u32> {
        if self.interval < 1 {
            return Err(RecurrenceError::invalid("pattern.interval", "must be at least 1"));
        }
        u32::try_from(self.interval)
            .map_err(|_| RecurrenceError::invalid("pattern.interval", "is too large"))
    }

    fn day_or_position(&self) -> Result<DaySelector> {
        match (self.day, self.nth, self.weekday) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => Err(RecurrenceError::invalid(
                "pattern.day",
                "cannot be combined with nth/weekday",
            )),
            (Some(day), None, None) => {
                let day = u32::try_from(day).map_err(|_| {
                    RecurrenceError::invalid("pattern.day", format!("must be between 1 and 31, got {day}"))
                })?;
                check_day(day)?;
                Ok(DaySelector::Day(day))
            }
            (None, Some(nth), Some(weekday)) => {
                let nth = i8::try_from(nth).map_err(|_| {
                    RecurrenceError::invalid(
                        "pattern.nth",
                        format!("must be between -5 and 5 excluding 0, got {nth}"),
                    )
                })?;
                let position = WeekdayPosition::new(nth, weekday).map_err(|e| e.within("pattern"))?;
                Ok(DaySelector::Position(position))
            }
            (None, Some(_), None) => Err(RecurrenceError::invalid(
                "pattern.weekday",
                "required when nth is given",
            )),
            (None, None, Some(_)) => Err(RecurrenceError::invalid(
                "pattern.nth",
                "required when weekday is given",
            )),
            (None, None, None) => Err(RecurrenceError::invalid(
                "pattern.day",
                "either day or nth and weekday are required",
            )),
        }
    }
}

enum DaySelector {
    Day(u32),
    Position(WeekdayPosition),
}

impl TryFrom<PatternSpec> for RecurrencePattern {
    type Error = RecurrenceError;

    fn try_from(spec: PatternSpec) -> Result<Self> {
        let interval = spec.interval()?;
        let pattern = match spec.frequency {
            Frequency::Daily => {
                spec.reject(!spec.days.is_empty(), "days")?;
                spec.reject(spec.month.is_some(), "month")?;
                spec.reject(spec.day.is_some(), "day")?;
                spec.reject(spec.nth.is_some(), "nth")?;
                spec.reject(spec.weekday.is_some(), "weekday")?;
                Self::Daily { interval }
            }
            Frequency::Weekly => {
                spec.reject(spec.month.is_some(), "month")?;
                spec.reject(spec.day.is_some(), "day")?;
                spec.reject(spec.nth.is_some(), "nth")?;
                spec.reject(spec.weekday.is_some(), "weekday")?;
                Self::Weekly {
                    interval,
                    days: spec.days.iter().copied().collect(),
                }
            }
            Frequency::Monthly => {
                spec.reject(!spec.days.is_empty(), "days")?;
                spec.reject(spec.month.is_some(), "month")?;
                let mode = match spec.day_or_position()? {
                    DaySelector::Day(day) => MonthlyMode::DayOfMonth(day),
                    DaySelector::Position(position) => MonthlyMode::NthWeekday(position),
                };
                Self::Monthly { interval, mode }
            }
            Frequency::Yearly => {
                spec.reject(!spec.days.is_empty(), "days")?;
                let month = spec
                    .month
                    .ok_or_else(|| RecurrenceError::invalid("pattern.month", "required for yearly rules"))?;
                let month = u32::try_from(month).map_err(|_| {
                    RecurrenceError::invalid("pattern.month", format!("must be between 1 and 12, got {month}"))
                })?;
                let mode = match spec.day_or_position()? {
                    DaySelector::Day(day) => YearlyMode::SpecificDate(day),
                    DaySelector::Position(position) => YearlyMode::NthWeekdayOfMonth(position),
                };
                Self::Yearly {
                    interval,
                    month,
                    mode,
                }
            }
        };
        pattern.validated()
    }
}

impl From<RecurrencePattern> for PatternSpec {
    fn from(pattern: RecurrencePattern) -> Self {
        let mut spec = PatternSpec::new(pattern.frequency());
        spec.interval = i64::from(pattern.interval());
        match pattern {
            RecurrencePattern::Daily { .. } => {}
            RecurrencePattern::Weekly { days, .. } => spec.days = days.into_iter().collect(),
            RecurrencePattern::Monthly { mode, .. } => match mode {
                MonthlyMode::DayOfMonth(day) => spec.day = Some(i64::from(day)),
                MonthlyMode::NthWeekday(position) => {
                    spec.nth = Some(i64::from(position.nth()));
                    spec.weekday = Some(position.weekday());
                }
            },
            RecurrencePattern::Yearly { month, mode, .. } => {
                spec.month = Some(i64::from(month));
                match mode {
                    YearlyMode::SpecificDate(day) => spec.day = Some(i64::from(day)),
                    YearlyMode::NthWeekdayOfMonth(position) => {
                        spec.nth = Some(i64::from(position.nth()));
                        spec.weekday = Some(position.weekday());
                    }
                }
            }
        }
        spec
    }
}

/// Loose input shape for a termination condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EndSpec {
    Never,
    AfterOccurrences { count: i64 },
    OnDate { date: NaiveDate },
}

impl TryFrom<EndSpec> for RecurrenceEnd {
    type Error = RecurrenceError;

    fn try_from(spec: EndSpec) -> Result<Self> {
        match spec {
            EndSpec::Never => Ok(Self::Never),
            EndSpec::AfterOccurrences { count } => {
                let count = u32::try_from(count)
                    .map_err(|_| RecurrenceError::invalid("end.count", "must be at least 1"))?;
                Self::after(count)
            }
            EndSpec::OnDate { date } => Ok(Self::OnDate(date)),
        }
    }
}

impl From<RecurrenceEnd> for EndSpec {
    fn from(end: RecurrenceEnd) -> Self {
        match end {
            RecurrenceEnd::Never => EndSpec::Never,
            RecurrenceEnd::AfterOccurrences(count) => EndSpec::AfterOccurrences {
                count: i64::from(count),
            },
            RecurrenceEnd::OnDate(date) => EndSpec::OnDate { date },
        }
    }
}
