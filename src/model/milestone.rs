//! Milestone (composite task) model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::now_ms;
use crate::model::recurrence::RecurrenceRule;

/// A composite task made of checklist items.
///
/// `recurrence` and `completed_at` are local-only for milestones: the
/// remote `milestones` table does not carry them, so a pull must leave
/// them untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: Uuid,
    pub title: String,
    pub notes: Option<String>,
    /// Creation instant, Unix millis. Round-trips on the wire.
    pub created_at: i64,
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
    /// Items owned exclusively by this milestone, ordered by position.
    pub items: Vec<MilestoneItem>,
}

impl Milestone {
    /// Create a milestone with a fresh client-generated id.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        let now = now_ms();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            notes: None,
            created_at: now,
            due_date: None,
            remind: false,
            is_done: false,
            is_starred: false,
            order: 0,
            recurrence: None,
            completed_at: None,
            updated_at: now,
            tag_ids: Vec::new(),
            items: Vec::new(),
        }
    }

    /// Number of completed items.
    #[must_use]
    pub fn done_items(&self) -> usize {
        self.items.iter().filter(|i| i.is_done).count()
    }

    /// True when every item is checked (and there is at least one).
    #[must_use]
    pub fn all_items_done(&self) -> bool {
        !self.items.is_empty() && self.done_items() == self.items.len()
    }
}

/// A checklist line owned by exactly one milestone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneItem {
    pub id: Uuid,
    pub milestone_id: Uuid,
    pub text: String,
    pub is_done: bool,
    pub position: i64,
}

impl MilestoneItem {
    /// Create an item with a fresh client-generated id.
    #[must_use]
    pub fn new(milestone_id: Uuid, text: impl Into<String>, position: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            milestone_id,
            text: text.into(),
            is_done: false,
            position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_progress() {
        let mut m = Milestone::new("Ship v1");
        assert!(!m.all_items_done());

        m.items.push(MilestoneItem::new(m.id, "Write docs", 0));
        m.items.push(MilestoneItem::new(m.id, "Cut release", 1));
        assert_eq!(m.done_items(), 0);

        m.items[0].is_done = true;
        assert_eq!(m.done_items(), 1);
        assert!(!m.all_items_done());

        m.items[1].is_done = true;
        assert!(m.all_items_done());
    }
}
