//! Deletion tombstones.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::now_ms;

/// Remote tables a tombstone can target.
///
/// Link tables never get tombstones: their rows die with the entity
/// (cascade) or are replaced wholesale on push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteTable {
    Tags,
    Checklists,
    Milestones,
    MilestoneItems,
}

impl RemoteTable {
    /// Remote table name on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::Tags => "tags",
            Self::Checklists => "simple_checklists",
            Self::Milestones => "milestones",
            Self::MilestoneItems => "milestone_items",
        }
    }
}

impl std::fmt::Display for RemoteTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RemoteTable {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tags" => Ok(Self::Tags),
            "simple_checklists" => Ok(Self::Checklists),
            "milestones" => Ok(Self::Milestones),
            "milestone_items" => Ok(Self::MilestoneItems),
            _ => Err(format!("Unknown remote table: {s}")),
        }
    }
}

/// A durable intent-to-delete.
///
/// Written in the same transaction as the local entity removal, so an
/// interrupted delete can never lose the remote-delete intent. Cleared
/// only after the remote delete succeeds (at-least-once delivery).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tombstone {
    pub id: Uuid,
    /// Id of the deleted entity.
    pub target_id: Uuid,
    pub table: RemoteTable,
    /// Unix millis of the local deletion.
    pub deleted_at: i64,
}

impl Tombstone {
    /// Record a deletion intent for `target_id` in `table`.
    #[must_use]
    pub fn new(target_id: Uuid, table: RemoteTable) -> Self {
        Self {
            id: Uuid::new_v4(),
            target_id,
            table,
            deleted_at: now_ms(),
        }
    }
}
