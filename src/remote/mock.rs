//! In-memory remote store for tests.
//!
//! Behaves like the real backend: upserts are keyed by id, deletes
//! cascade the way the server's foreign keys do, and selects return
//! rows in a deterministic order. Tests can inject failures, delays,
//! and out-of-band "other device" edits.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use uuid::Uuid;

use crate::remote::client::RemoteStore;
use crate::remote::rows::{
    ChecklistRow, ChecklistTagRow, MilestoneItemRow, MilestoneRow, MilestoneTagRow, TagRow,
};
use crate::sync::{SyncError, SyncResult};

#[derive(Default)]
pub struct MockState {
    pub tags: BTreeMap<Uuid, TagRow>,
    pub checklists: BTreeMap<Uuid, ChecklistRow>,
    pub checklist_links: BTreeSet<(Uuid, Uuid)>,
    pub milestones: BTreeMap<Uuid, MilestoneRow>,
    pub items: BTreeMap<Uuid, MilestoneItemRow>,
    pub milestone_links: BTreeSet<(Uuid, Uuid)>,

    pub network_calls: usize,
    pub fail_tag_selects: bool,
    pub fail_milestone_deletes: bool,
    pub items_select_override: Option<Vec<MilestoneItemRow>>,
    pub call_delay: Option<Duration>,
}

/// Cloneable handle to a shared in-memory remote.
#[derive(Clone, Default)]
pub struct MockRemote {
    state: Arc<Mutex<MockState>>,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect or mutate the remote state directly ("another device").
    pub fn with_state<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn network_calls(&self) -> usize {
        self.with_state(|s| s.network_calls)
    }

    async fn begin_call(&self, failing: impl FnOnce(&MockState) -> bool) -> SyncResult<()> {
        let delay = self.with_state(|s| s.call_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.with_state(|s| {
            s.network_calls += 1;
            if failing(s) {
                Err(SyncError::Network("mock: injected failure".to_string()))
            } else {
                Ok(())
            }
        })
    }

    async fn count_call(&self) -> SyncResult<()> {
        self.begin_call(|_| false).await
    }
}

impl RemoteStore for MockRemote {
    async fn upsert_tags(&self, rows: Vec<TagRow>) -> SyncResult<()> {
        self.count_call().await?;
        self.with_state(|s| {
            for row in rows {
                s.tags.insert(row.id, row);
            }
        });
        Ok(())
    }

    async fn select_tags(&self, user_id: &str) -> SyncResult<Vec<TagRow>> {
        self.begin_call(|s| s.fail_tag_selects).await?;
        let user_id = user_id.to_string();
        Ok(self.with_state(|s| {
            s.tags
                .values()
                .filter(|r| r.user_id == user_id)
                .cloned()
                .collect()
        }))
    }

    async fn delete_tag(&self, user_id: &str, id: Uuid) -> SyncResult<()> {
        self.count_call().await?;
        let user_id = user_id.to_string();
        self.with_state(|s| {
            if s.tags.get(&id).is_some_and(|r| r.user_id == user_id) {
                s.tags.remove(&id);
                s.checklist_links.retain(|(_, tag)| *tag != id);
                s.milestone_links.retain(|(_, tag)| *tag != id);
            }
        });
        Ok(())
    }

    async fn upsert_checklists(&self, rows: Vec<ChecklistRow>) -> SyncResult<()> {
        self.count_call().await?;
        self.with_state(|s| {
            for row in rows {
                s.checklists.insert(row.id, row);
            }
        });
        Ok(())
    }

    async fn select_checklists(&self, user_id: &str) -> SyncResult<Vec<ChecklistRow>> {
        self.count_call().await?;
        let user_id = user_id.to_string();
        Ok(self.with_state(|s| {
            s.checklists
                .values()
                .filter(|r| r.user_id == user_id)
                .cloned()
                .collect()
        }))
    }

    async fn delete_checklist(&self, user_id: &str, id: Uuid) -> SyncResult<()> {
        self.count_call().await?;
        let user_id = user_id.to_string();
        self.with_state(|s| {
            if s.checklists.get(&id).is_some_and(|r| r.user_id == user_id) {
                s.checklists.remove(&id);
                s.checklist_links.retain(|(owner, _)| *owner != id);
            }
        });
        Ok(())
    }

    async fn upsert_checklist_links(&self, rows: Vec<ChecklistTagRow>) -> SyncResult<()> {
        self.count_call().await?;
        self.with_state(|s| {
            for row in rows {
                s.checklist_links.insert((row.checklist_id, row.tag_id));
            }
        });
        Ok(())
    }

    async fn select_checklist_links(&self) -> SyncResult<Vec<ChecklistTagRow>> {
        self.count_call().await?;
        Ok(self.with_state(|s| {
            s.checklist_links
                .iter()
                .map(|&(checklist_id, tag_id)| ChecklistTagRow {
                    checklist_id,
                    tag_id,
                })
                .collect()
        }))
    }

    async fn delete_checklist_links(&self, checklist_id: Uuid) -> SyncResult<()> {
        self.count_call().await?;
        self.with_state(|s| {
            s.checklist_links.retain(|(owner, _)| *owner != checklist_id);
        });
        Ok(())
    }

    async fn upsert_milestones(&self, rows: Vec<MilestoneRow>) -> SyncResult<()> {
        self.count_call().await?;
        self.with_state(|s| {
            for row in rows {
                s.milestones.insert(row.id, row);
            }
        });
        Ok(())
    }

    async fn select_milestones(&self, user_id: &str) -> SyncResult<Vec<MilestoneRow>> {
        self.count_call().await?;
        let user_id = user_id.to_string();
        Ok(self.with_state(|s| {
            s.milestones
                .values()
                .filter(|r| r.user_id == user_id)
                .cloned()
                .collect()
        }))
    }

    async fn delete_milestone(&self, user_id: &str, id: Uuid) -> SyncResult<()> {
        self.begin_call(|s| s.fail_milestone_deletes).await?;
        let user_id = user_id.to_string();
        self.with_state(|s| {
            if s.milestones.get(&id).is_some_and(|r| r.user_id == user_id) {
                s.milestones.remove(&id);
                s.items.retain(|_, item| item.milestone_id != id);
                s.milestone_links.retain(|(owner, _)| *owner != id);
            }
        });
        Ok(())
    }

    async fn upsert_milestone_items(&self, rows: Vec<MilestoneItemRow>) -> SyncResult<()> {
        self.count_call().await?;
        self.with_state(|s| {
            for row in rows {
                s.items.insert(row.id, row);
            }
        });
        Ok(())
    }

    async fn select_milestone_items(&self) -> SyncResult<Vec<MilestoneItemRow>> {
        self.count_call().await?;
        Ok(self.with_state(|s| {
            s.items_select_override
                .clone()
                .unwrap_or_else(|| s.items.values().cloned().collect())
        }))
    }

    async fn delete_milestone_item(&self, id: Uuid) -> SyncResult<()> {
        self.count_call().await?;
        self.with_state(|s| {
            s.items.remove(&id);
        });
        Ok(())
    }

    async fn upsert_milestone_links(&self, rows: Vec<MilestoneTagRow>) -> SyncResult<()> {
        self.count_call().await?;
        self.with_state(|s| {
            for row in rows {
                s.milestone_links.insert((row.milestone_id, row.tag_id));
            }
        });
        Ok(())
    }

    async fn select_milestone_links(&self) -> SyncResult<Vec<MilestoneTagRow>> {
        self.count_call().await?;
        Ok(self.with_state(|s| {
            s.milestone_links
                .iter()
                .map(|&(milestone_id, tag_id)| MilestoneTagRow {
                    milestone_id,
                    tag_id,
                })
                .collect()
        }))
    }

    async fn delete_milestone_links(&self, milestone_id: Uuid) -> SyncResult<()> {
        self.count_call().await?;
        self.with_state(|s| {
            s.milestone_links.retain(|(owner, _)| *owner != milestone_id);
        });
        Ok(())
    }
}
