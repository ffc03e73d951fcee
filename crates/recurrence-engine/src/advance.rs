//! Advancement engine -- decides what happens to a recurring task when one of
//! its occurrences is completed.
//!
//! The engine returns a decision and never touches the task record itself.
//! Given the same state and completed occurrence date it always reaches the
//! same decision, so storage-layer retries are idempotent.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calculator;
use crate::rule::RecurrenceState;

/// One completed occurrence. Append-only; never rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskHistoryEntry {
    pub occurrence_date: NaiveDate,
    pub completed_at: DateTime<Utc>,
    pub completed_by: String,
}

/// What the caller must do with the task after a completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Reopen the task, due on the given date.
    Continue(NaiveDate),
    /// Detach the recurrence and complete the task permanently.
    Terminate,
}

/// Result of [`advance`]: the updated state, the next due date (if any), and
/// the history entry to append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advancement {
    pub state: RecurrenceState,
    pub next_due: Option<NaiveDate>,
    pub entry: TaskHistoryEntry,
}

impl Advancement {
    pub fn outcome(&self) -> Outcome {
        match self.next_due {
            Some(date) => Outcome::Continue(date),
            None => Outcome::Terminate,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.next_due.is_none()
    }
}

/// Record completion of `occurrence` by `completed_by`, stamped with the
/// current time.
pub fn advance(state: &RecurrenceState, occurrence: NaiveDate, completed_by: &str) -> Advancement {
    advance_at(state, occurrence, completed_by, Utc::now())
}

/// Same as [`advance`] with an explicit completion timestamp.
///
/// Termination is checked in order: a spent `AfterOccurrences` budget, then
/// the next calculated occurrence, then an `OnDate` limit. The history entry
/// is produced in every case, including the terminating one.
pub fn advance_at(
    state: &RecurrenceState,
    occurrence: NaiveDate,
    completed_by: &str,
    completed_at: DateTime<Utc>,
) -> Advancement {
    let entry = TaskHistoryEntry {
        occurrence_date: occurrence,
        completed_at,
        completed_by: completed_by.to_string(),
    };

    let mut next = state.clone();
    next.record_completion(occurrence);

    // next_occurrence drops candidates past an OnDate limit.
    let next_due = if next.is_exhausted() {
        None
    } else {
        calculator::next_occurrence(&next, occurrence, false)
    };

    debug!(
        %occurrence,
        occurrence_count = next.occurrence_count(),
        next_due = ?next_due,
        terminated = next_due.is_none(),
        "advanced recurrence"
    );

    Advancement {
        state: next,
        next_due,
        entry,
    }
}
