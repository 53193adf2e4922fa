//! Wire row types for the remote store.
//!
//! Field names and shapes are the cross-device contract: every device
//! reads and writes these exact columns, so they must round-trip
//! unchanged. Timestamps travel as RFC3339; locally they are Unix
//! millis, converted only at this boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{
    now_ms, Milestone, MilestoneItem, RecurrenceRule, SimpleTask, Tag, TextColor,
};

fn wire_ts(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or(DateTime::UNIX_EPOCH)
}

fn local_ts(dt: DateTime<Utc>) -> i64 {
    dt.timestamp_millis()
}

/// `tags` table row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRow {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub color_hex: String,
}

impl TagRow {
    #[must_use]
    pub fn from_tag(tag: &Tag, user_id: &str) -> Self {
        Self {
            id: tag.id,
            user_id: user_id.to_string(),
            name: tag.name.clone(),
            color_hex: tag.color_hex.clone(),
        }
    }

    /// Fold this row into a local tag.
    ///
    /// Scalar fields are overwritten (remote wins); the local-only
    /// `text_color` preference and mutation stamp survive. With no
    /// existing tag the remote id becomes the permanent local id.
    #[must_use]
    pub fn into_tag(self, existing: Option<&Tag>) -> Tag {
        match existing {
            Some(local) => Tag {
                id: self.id,
                name: self.name,
                color_hex: self.color_hex,
                text_color: local.text_color,
                updated_at: local.updated_at,
            },
            None => Tag {
                id: self.id,
                name: self.name,
                color_hex: self.color_hex,
                text_color: TextColor::Auto,
                updated_at: now_ms(),
            },
        }
    }
}

/// `simple_checklists` table row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistRow {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub notes: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub remind: bool,
    pub is_done: bool,
    pub is_starred: bool,
    pub user_order: i64,
    pub recurrence_rule: Option<RecurrenceRule>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ChecklistRow {
    #[must_use]
    pub fn from_task(task: &SimpleTask, user_id: &str) -> Self {
        Self {
            id: task.id,
            user_id: user_id.to_string(),
            title: task.title.clone(),
            notes: task.notes.clone(),
            due_date: task.due_date.map(wire_ts),
            remind: task.remind,
            is_done: task.is_done,
            is_starred: task.is_starred,
            user_order: task.order,
            recurrence_rule: task.recurrence,
            completed_at: task.completed_at.map(wire_ts),
        }
    }

    /// Fold this row into a local task (remote wins every scalar).
    ///
    /// Tag links are reconciled separately from the link table. The
    /// local mutation stamp is kept as-is; it is not a sync input.
    #[must_use]
    pub fn into_task(self, existing: Option<&SimpleTask>) -> SimpleTask {
        SimpleTask {
            id: self.id,
            title: self.title,
            notes: self.notes,
            due_date: self.due_date.map(local_ts),
            remind: self.remind,
            is_done: self.is_done,
            is_starred: self.is_starred,
            order: self.user_order,
            recurrence: self.recurrence_rule,
            completed_at: self.completed_at.map(local_ts),
            updated_at: existing.map_or_else(now_ms, |t| t.updated_at),
            tag_ids: existing.map(|t| t.tag_ids.clone()).unwrap_or_default(),
        }
    }
}

/// `checklist_tags` link table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChecklistTagRow {
    pub checklist_id: Uuid,
    pub tag_id: Uuid,
}

/// `milestones` table row.
///
/// The remote table carries no `recurrence_rule` or `completed_at`;
/// those milestone fields are local-only and survive pulls untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneRow {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub remind: bool,
    pub is_done: bool,
    pub is_starred: bool,
    pub user_order: i64,
}

impl MilestoneRow {
    #[must_use]
    pub fn from_milestone(m: &Milestone, user_id: &str) -> Self {
        Self {
            id: m.id,
            user_id: user_id.to_string(),
            title: m.title.clone(),
            notes: m.notes.clone(),
            created_at: wire_ts(m.created_at),
            due_date: m.due_date.map(wire_ts),
            remind: m.remind,
            is_done: m.is_done,
            is_starred: m.is_starred,
            user_order: m.order,
        }
    }

    /// Fold this row into a local milestone (remote wins every wire
    /// scalar; local-only fields, links and items are untouched here).
    #[must_use]
    pub fn into_milestone(self, existing: Option<&Milestone>) -> Milestone {
        Milestone {
            id: self.id,
            title: self.title,
            notes: self.notes,
            created_at: local_ts(self.created_at),
            due_date: self.due_date.map(local_ts),
            remind: self.remind,
            is_done: self.is_done,
            is_starred: self.is_starred,
            order: self.user_order,
            recurrence: existing.and_then(|m| m.recurrence),
            completed_at: existing.and_then(|m| m.completed_at),
            updated_at: existing.map_or_else(now_ms, |m| m.updated_at),
            tag_ids: existing.map(|m| m.tag_ids.clone()).unwrap_or_default(),
            items: existing.map(|m| m.items.clone()).unwrap_or_default(),
        }
    }
}

/// `milestone_items` table row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneItemRow {
    pub id: Uuid,
    pub milestone_id: Uuid,
    pub text: String,
    pub is_done: bool,
    pub position: i64,
}

impl MilestoneItemRow {
    #[must_use]
    pub fn from_item(item: &MilestoneItem) -> Self {
        Self {
            id: item.id,
            milestone_id: item.milestone_id,
            text: item.text.clone(),
            is_done: item.is_done,
            position: item.position,
        }
    }

    #[must_use]
    pub fn into_item(self) -> MilestoneItem {
        MilestoneItem {
            id: self.id,
            milestone_id: self.milestone_id,
            text: self.text,
            is_done: self.is_done,
            position: self.position,
        }
    }
}

/// `milestone_tags` link table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MilestoneTagRow {
    pub milestone_id: Uuid,
    pub tag_id: Uuid,
}
