//! In-memory task record that applies advancement decisions.
//!
//! Storage layers persist the fields of [`Task`] together with the history;
//! this type only encodes what a completion does to them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::advance::{advance_at, TaskHistoryEntry};
use crate::rule::RecurrenceState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Open,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub title: String,
    pub status: TaskStatus,
    pub due: Option<NaiveDate>,
    pub completed_at: Option<DateTime<Utc>>,
    recurrence: Option<RecurrenceState>,
    #[serde(default)]
    history: Vec<TaskHistoryEntry>,
}

impl Task {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            status: TaskStatus::Open,
            due: None,
            completed_at: None,
            recurrence: None,
            history: Vec::new(),
        }
    }

    pub fn with_due(mut self, due: NaiveDate) -> Self {
        self.due = Some(due);
        self
    }

    pub fn recurrence(&self) -> Option<&RecurrenceState> {
        self.recurrence.as_ref()
    }

    pub fn history(&self) -> &[TaskHistoryEntry] {
        &self.history
    }

    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }

    /// Attach a recurrence; the due date becomes the state's current due date.
    /// A rule that yields no occurrence at all leaves the task without a due date.
    pub fn set_recurrence(&mut self, state: RecurrenceState) {
        self.due = state.next_due();
        self.recurrence = Some(state);
    }

    /// Detach the recurrence, keeping the current due date.
    pub fn clear_recurrence(&mut self) -> Option<RecurrenceState> {
        self.recurrence.take()
    }

    /// Complete the current occurrence. Returns the new due date when a
    /// recurring task rolls forward, `None` when the task is now permanently
    /// completed. Completing an already completed task does nothing.
    pub fn complete(&mut self, completed_by: &str, now: DateTime<Utc>) -> Option<NaiveDate> {
        if self.status == TaskStatus::Completed {
            return None;
        }

        let occurrence = self.due.unwrap_or_else(|| now.date_naive());

        let Some(state) = self.recurrence.as_ref() else {
            self.history.push(TaskHistoryEntry {
                occurrence_date: occurrence,
                completed_at: now,
                completed_by: completed_by.to_string(),
            });
            self.finish(now);
            return None;
        };

        let advancement = advance_at(state, occurrence, completed_by, now);
        self.history.push(advancement.entry);

        match advancement.next_due {
            Some(next) => {
                self.recurrence = Some(advancement.state);
                self.due = Some(next);
                self.status = TaskStatus::Open;
                self.completed_at = None;
                Some(next)
            }
            None => {
                self.recurrence = None;
                self.finish(now);
                None
            }
        }
    }

    fn finish(&mut self, now: DateTime<Utc>) {
        self.status = TaskStatus::Completed;
        self.completed_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{RecurrenceEnd, RecurrencePattern, RecurrenceRule};
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap()
    }

    #[test]
    fn one_off_task_completes_once() {
        let mut task = Task::new("Return library books").with_due(date(2024, 6, 1));

        assert_eq!(task.complete("pat", now()), None);
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.completed_at, Some(now()));
        assert_eq!(task.history().len(), 1);
        assert_eq!(task.history()[0].occurrence_date, date(2024, 6, 1));

        assert_eq!(task.complete("pat", now()), None);
        assert_eq!(task.history().len(), 1);
    }

    #[test]
    fn undated_task_uses_completion_day() {
        let mut task = Task::new("Call plumber");
        task.complete("pat", now());
        assert_eq!(task.history()[0].occurrence_date, date(2024, 6, 1));
    }

    #[test]
    fn recurring_task_rolls_forward_then_finalizes() {
        let rule = RecurrenceRule::new(
            RecurrencePattern::daily(7).unwrap(),
            RecurrenceEnd::after(2).unwrap(),
        )
        .unwrap();
        let mut task = Task::new("Water plants");
        task.set_recurrence(RecurrenceState::new(rule, date(2024, 6, 3)));
        assert_eq!(task.due, Some(date(2024, 6, 3)));

        assert_eq!(task.complete("kim", now()), Some(date(2024, 6, 10)));
        assert_eq!(task.status, TaskStatus::Open);
        assert_eq!(task.completed_at, None);
        assert!(task.is_recurring());

        assert_eq!(task.complete("kim", now()), None);
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(!task.is_recurring());
        assert_eq!(task.history().len(), 2);
        assert_eq!(task.due, Some(date(2024, 6, 10)));
    }
}
