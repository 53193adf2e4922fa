//! Tombstone replay against the remote store.
//!
//! Recording happens at delete time: the storage layer writes the
//! tombstone and removes the entity in one transaction, so an
//! interrupted delete can never lose the remote-delete intent. This
//! module owns the other half of the contract: replaying pending
//! intents before a table's pull phase, clearing them only on success.

use std::collections::HashSet;

use uuid::Uuid;

use crate::model::{RemoteTable, Tombstone};
use crate::remote::RemoteStore;
use crate::storage::SqliteStorage;
use crate::sync::types::{PassStats, SyncError, SyncResult};

/// Replays durable delete intents, with at-least-once delivery.
pub struct TombstoneTracker<'a> {
    store: &'a mut SqliteStorage,
}

impl<'a> TombstoneTracker<'a> {
    #[must_use]
    pub fn new(store: &'a mut SqliteStorage) -> Self {
        Self { store }
    }

    /// Pending intents for one remote table (or all of them).
    ///
    /// # Errors
    ///
    /// Returns an error if the local query fails.
    pub fn pending(&self, table: Option<RemoteTable>) -> SyncResult<Vec<Tombstone>> {
        self.store.pending_tombstones(table).map_err(Into::into)
    }

    /// Replay every pending intent for `table` against the remote store.
    ///
    /// A successful remote delete clears its tombstone; a transient
    /// network failure retains it for the next run (the pull phase must
    /// then skip that id so the dead entity is not resurrected). Auth
    /// and decode failures propagate and abort the run.
    ///
    /// Returns the target ids still pending after the replay.
    ///
    /// # Errors
    ///
    /// Returns an error on non-transient remote failures or if clearing
    /// the delivered tombstones fails locally.
    pub async fn replay<R: RemoteStore>(
        &mut self,
        remote: &R,
        user_id: &str,
        table: RemoteTable,
        stats: &mut PassStats,
    ) -> SyncResult<HashSet<Uuid>> {
        let pending = self.pending(Some(table))?;
        if pending.is_empty() {
            return Ok(HashSet::new());
        }

        let mut cleared = Vec::new();
        let mut retained = HashSet::new();

        for tombstone in pending {
            let result = match table {
                RemoteTable::Tags => remote.delete_tag(user_id, tombstone.target_id).await,
                RemoteTable::Checklists => {
                    remote.delete_checklist(user_id, tombstone.target_id).await
                }
                RemoteTable::Milestones => {
                    remote.delete_milestone(user_id, tombstone.target_id).await
                }
                RemoteTable::MilestoneItems => {
                    remote.delete_milestone_item(tombstone.target_id).await
                }
            };

            match result {
                Ok(()) => {
                    cleared.push(tombstone.id);
                    stats.deletes_replayed += 1;
                }
                Err(e) if e.is_transient() => {
                    tracing::warn!(
                        table = table.as_str(),
                        target = %tombstone.target_id,
                        error = %e,
                        "remote delete failed, retaining tombstone"
                    );
                    retained.insert(tombstone.target_id);
                    stats.deletes_retained += 1;
                }
                Err(e) => return Err(e),
            }
        }

        self.store
            .clear_tombstones(&cleared)
            .map_err(SyncError::from)?;

        Ok(retained)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Milestone, Tag};
    use crate::remote::mock::MockRemote;
    use crate::remote::rows::TagRow;

    const USER: &str = "user-1";

    #[tokio::test]
    async fn test_replay_clears_on_success() {
        let mut store = SqliteStorage::open_memory().unwrap();
        let remote = MockRemote::new();

        let tag = Tag::new("Work", "#FF8800");
        store.save_tag(&tag).unwrap();
        remote.with_state(|s| {
            s.tags.insert(tag.id, TagRow::from_tag(&tag, USER));
        });
        store.delete_tag(tag.id).unwrap();

        let mut stats = PassStats::default();
        let retained = TombstoneTracker::new(&mut store)
            .replay(&remote, USER, RemoteTable::Tags, &mut stats)
            .await
            .unwrap();

        assert!(retained.is_empty());
        assert_eq!(stats.deletes_replayed, 1);
        assert!(remote.with_state(|s| s.tags.is_empty()));
        assert!(store.pending_tombstones(None).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replay_retains_on_network_failure() {
        let mut store = SqliteStorage::open_memory().unwrap();
        let remote = MockRemote::new();
        remote.with_state(|s| s.fail_milestone_deletes = true);

        let m = Milestone::new("Launch");
        store.save_milestone(&m).unwrap();
        store.delete_milestone(m.id).unwrap();

        let mut stats = PassStats::default();
        let retained = TombstoneTracker::new(&mut store)
            .replay(&remote, USER, RemoteTable::Milestones, &mut stats)
            .await
            .unwrap();

        assert!(retained.contains(&m.id));
        assert_eq!(stats.deletes_retained, 1);
        assert_eq!(stats.deletes_replayed, 0);
        // The intent survives for the next run.
        assert_eq!(store.pending_tombstones(None).unwrap().len(), 1);
    }
}
