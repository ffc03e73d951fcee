//! # recurrence-engine
//!
//! Drift-free recurrence rules for household tasks.
//!
//! A rule ("every 2 weeks on Mon/Wed", "the last Friday of every month",
//! "yearly until 2030") is projected from a fixed anchor date into a
//! deterministic sequence of due dates. Completing an occurrence advances the
//! task's progress without ever moving the anchor, so monthly and yearly rules
//! never slide.
//!
//! ```rust
//! use chrono::NaiveDate;
//! use recurrence_engine::{
//!     advance, codec, RecurrenceEnd, RecurrencePattern, RecurrenceRule, RecurrenceState, Weekday,
//! };
//!
//! let pattern = RecurrencePattern::weekly(2, [Weekday::Monday, Weekday::Wednesday]).unwrap();
//! let rule = RecurrenceRule::new(pattern, RecurrenceEnd::after(10).unwrap()).unwrap();
//! assert_eq!(
//!     codec::encode(&rule).unwrap(),
//!     vec!["RRULE:FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,WE;COUNT=10".to_string()]
//! );
//!
//! let anchor = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let state = RecurrenceState::new(rule, anchor);
//! assert_eq!(state.next_due(), Some(anchor));
//!
//! let step = advance(&state, anchor, "alex");
//! assert_eq!(step.next_due, NaiveDate::from_ymd_opt(2024, 1, 3));
//! ```
//!
//! ## Modules
//!
//! - [`primitives`] -- weekdays, month arithmetic, nth-weekday positions
//! - [`rule`] -- patterns, end conditions, per-task state, validated input
//! - [`calculator`] -- next occurrence after a date; occurrence iterators
//! - [`advance`] -- completion handling and continue/terminate decisions
//! - [`codec`] -- provider `RRULE:` text encoding and decoding
//! - [`task`] -- in-memory task record applying advancement decisions
//! - [`error`] -- Error types

pub mod advance;
pub mod calculator;
pub mod codec;
pub mod error;
pub mod primitives;
pub mod rule;
pub mod task;

pub use advance::{advance, advance_at, Advancement, Outcome, TaskHistoryEntry};
pub use calculator::{first_occurrence, next_occurrence, occurrences, upcoming, Occurrences};
pub use error::RecurrenceError;
pub use primitives::{Weekday, WeekdayPosition};
pub use rule::{
    EndSpec, Frequency, MonthlyMode, PatternSpec, RecurrenceEnd, RecurrencePattern, RecurrenceRule,
    RecurrenceState, YearlyMode,
};
pub use task::{Task, TaskStatus};
