//! Simple (leaf) task model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::now_ms;
use crate::model::recurrence::RecurrenceRule;

/// A leaf task.
///
/// `tag_ids` is the local side of the `checklist_tags` link table; sync
/// replaces the remote link set wholesale on every push.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleTask {
    pub id: Uuid,
    pub title: String,
    pub notes: Option<String>,
    /// Due instant, Unix millis.
    pub due_date: Option<i64>,
    pub remind: bool,
    pub is_done: bool,
    pub is_starred: bool,
    /// Manual sort position (`user_order` on the wire).
    pub order: i64,
    pub recurrence: Option<RecurrenceRule>,
    pub completed_at: Option<i64>,
    /// Unix millis of the last local mutation. Not consulted by sync.
    pub updated_at: i64,
    pub tag_ids: Vec<Uuid>,
}

impl SimpleTask {
    /// Create a task with a fresh client-generated id.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            notes: None,
            due_date: None,
            remind: false,
            is_done: false,
            is_starred: false,
            order: 0,
            recurrence: None,
            completed_at: None,
            updated_at: now_ms(),
            tag_ids: Vec::new(),
        }
    }

    /// Mark the task complete.
    ///
    /// A recurring task with a due date rolls forward to its next
    /// occurrence and stays open; everything else is marked done with a
    /// completion stamp. Returns `true` when the task rolled forward
    /// instead of closing.
    pub fn complete(&mut self, now: i64) -> bool {
        self.updated_at = now;
        match (self.recurrence, self.due_date) {
            (Some(rule), Some(due)) => {
                self.due_date = Some(rule.next_from(due));
                self.is_done = false;
                self.completed_at = None;
                true
            }
            _ => {
                self.is_done = true;
                self.completed_at = Some(now);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_stamps_completed_at() {
        let mut task = SimpleTask::new("Water plants");
        let recurred = task.complete(1_000);
        assert!(!recurred);
        assert!(task.is_done);
        assert_eq!(task.completed_at, Some(1_000));
    }

    #[test]
    fn test_complete_recurring_rolls_due_date() {
        let mut task = SimpleTask::new("Weekly review");
        task.recurrence = Some(RecurrenceRule::Daily);
        task.due_date = Some(86_400_000);

        let recurred = task.complete(100_000_000);
        assert!(recurred);
        assert!(!task.is_done);
        assert_eq!(task.due_date, Some(2 * 86_400_000));
        assert_eq!(task.completed_at, None);
    }

    #[test]
    fn test_complete_recurring_without_due_date_closes() {
        let mut task = SimpleTask::new("One-off");
        task.recurrence = Some(RecurrenceRule::Weekly);
        assert!(!task.complete(5));
        assert!(task.is_done);
    }
}
