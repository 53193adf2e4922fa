//! Sync orchestration.
//!
//! One [`SyncEngine::run`] reconciles the local store against the
//! remote store in strictly ordered passes: tags, then simple tasks,
//! then milestones with their items. Tags go first because the later
//! passes resolve link rows through the tag map. Each pass replays its
//! pending tombstones, pushes every local record, then pulls the remote
//! table with remote-wins overwrite semantics.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use uuid::Uuid;

use crate::model::{
    now_ms, GamificationState, Milestone, MilestoneItem, RemoteTable, SimpleTask, StreakState, Tag,
};
use crate::remote::rows::{ChecklistRow, ChecklistTagRow, MilestoneItemRow, MilestoneRow, MilestoneTagRow, TagRow};
use crate::remote::RemoteStore;
use crate::storage::SqliteStorage;
use crate::sync::hash::same_content;
use crate::sync::merge;
use crate::sync::tombstone::TombstoneTracker;
use crate::sync::types::{
    ItemStats, PassStats, SyncError, SyncOutcome, SyncResult, SyncStatus, SyncSummary,
};

/// Orchestrates sync runs over an injected local store and remote client.
///
/// A boolean single-flight guard serializes invocations: a second
/// concurrent `run` returns [`SyncOutcome::AlreadyRunning`] immediately,
/// without being queued. There is no cancellation; a started run
/// proceeds to completion or failure.
pub struct SyncEngine<R: RemoteStore> {
    store: tokio::sync::Mutex<SqliteStorage>,
    remote: R,
    user_id: String,
    running: AtomicBool,
    status: Mutex<StatusInner>,
}

#[derive(Default)]
struct StatusInner {
    last_success_at: Option<i64>,
    last_error: Option<String>,
}

impl<R: RemoteStore> SyncEngine<R> {
    /// Build an engine from its dependencies. No global instance exists;
    /// callers own the engine value.
    #[must_use]
    pub fn new(store: SqliteStorage, remote: R, user_id: impl Into<String>) -> Self {
        Self {
            store: tokio::sync::Mutex::new(store),
            remote,
            user_id: user_id.into(),
            running: AtomicBool::new(false),
            status: Mutex::new(StatusInner::default()),
        }
    }

    /// The authenticated user every remote operation is scoped to.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Borrow the engine's local store (e.g. to read results or apply
    /// foreground mutations between runs).
    pub async fn store(&self) -> tokio::sync::MutexGuard<'_, SqliteStorage> {
        self.store.lock().await
    }

    /// Snapshot of the observable engine state, for polling consumers.
    #[must_use]
    pub fn status(&self) -> SyncStatus {
        let inner = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        SyncStatus {
            is_running: self.running.load(Ordering::Acquire),
            last_success_at: inner.last_success_at,
            last_error: inner.last_error.clone(),
        }
    }

    /// Execute one complete sync pass sequence.
    ///
    /// Failure aborts the remaining passes of the run; passes already
    /// committed are not rolled back. Partial synchronization is an
    /// accepted outcome, retried wholesale on the next triggered run.
    ///
    /// Known race, by design: the pull phase overwrites scalar fields
    /// remote-wins, so a foreground edit committed between push and
    /// pull of the same run can be clobbered. Nothing guards this:
    /// `updated_at` is stored but not consulted.
    ///
    /// # Errors
    ///
    /// Returns the first pass error: transient network failures heal on
    /// the next run, auth and decode failures need the caller.
    pub async fn run(&self) -> SyncResult<SyncOutcome> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("sync already in flight, skipping");
            return Ok(SyncOutcome::AlreadyRunning);
        }

        let result = self.run_passes().await;

        {
            let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
            match &result {
                Ok(_) => {
                    status.last_success_at = Some(now_ms());
                    status.last_error = None;
                }
                Err(e) => status.last_error = Some(e.to_string()),
            }
        }
        self.running.store(false, Ordering::Release);

        result.map(SyncOutcome::Completed)
    }

    /// Fold a remote gamification/streak snapshot into the local store.
    ///
    /// Invoked independently of [`Self::run`], at session restore and
    /// at account-merge time, with no ordering guarantee, which the
    /// ratchet merge rules are built for.
    ///
    /// # Errors
    ///
    /// Returns an error if the local store cannot be read or written.
    pub async fn merge_remote_progress(
        &self,
        remote_counters: &GamificationState,
        remote_streak: &StreakState,
    ) -> SyncResult<(GamificationState, StreakState)> {
        let mut store = self.store.lock().await;

        let counters = merge::merge_counters(&store.gamification()?, remote_counters);
        let streak = merge::merge_streak(&store.streak()?, remote_streak);
        store.set_gamification(&counters)?;
        store.set_streak(&streak)?;

        Ok((counters, streak))
    }

    async fn run_passes(&self) -> SyncResult<SyncSummary> {
        let mut store = self.store.lock().await;
        let mut summary = SyncSummary::default();

        tracing::info!(user = %self.user_id, "sync run started");
        let tags = self.sync_tags(&mut store, &mut summary.tags).await?;
        self.sync_tasks(&mut store, &tags, &mut summary.tasks).await?;
        self.sync_milestones(&mut store, &tags, &mut summary.milestones, &mut summary.items)
            .await?;
        tracing::info!(
            pushed = summary.total_pushed(),
            pulled = summary.total_pulled(),
            dropped_writes = summary.total_local_write_failures(),
            "sync run finished"
        );

        Ok(summary)
    }

    /// Tags pass. Returns the tag map the later passes resolve links
    /// against.
    async fn sync_tags(
        &self,
        store: &mut SqliteStorage,
        stats: &mut PassStats,
    ) -> SyncResult<HashMap<Uuid, Tag>> {
        let pending = TombstoneTracker::new(store)
            .replay(&self.remote, &self.user_id, RemoteTable::Tags, stats)
            .await?;

        // Push
        let local = store.list_tags().map_err(SyncError::from)?;
        let rows = local
            .iter()
            .map(|t| TagRow::from_tag(t, &self.user_id))
            .collect();
        self.remote.upsert_tags(rows).await?;
        stats.pushed = local.len();

        // Pull
        let mut tags: HashMap<Uuid, Tag> = local.into_iter().map(|t| (t.id, t)).collect();
        for row in self.remote.select_tags(&self.user_id).await? {
            if pending.contains(&row.id) {
                continue;
            }
            let existing = tags.get(&row.id).cloned();
            let merged = row.into_tag(existing.as_ref());
            if let Some(ref local) = existing {
                if same_content(local, &merged) {
                    stats.unchanged += 1;
                    continue;
                }
            }
            match store.save_tag(&merged) {
                Ok(()) => {
                    if existing.is_some() {
                        stats.updated += 1;
                    } else {
                        stats.created += 1;
                    }
                    tags.insert(merged.id, merged);
                }
                Err(e) => {
                    tracing::warn!(id = %merged.id, error = %e, "dropped local tag write");
                    stats.local_write_failures += 1;
                }
            }
        }

        Ok(tags)
    }

    /// Simple task pass.
    async fn sync_tasks(
        &self,
        store: &mut SqliteStorage,
        tags: &HashMap<Uuid, Tag>,
        stats: &mut PassStats,
    ) -> SyncResult<()> {
        let pending = TombstoneTracker::new(store)
            .replay(&self.remote, &self.user_id, RemoteTable::Checklists, stats)
            .await?;

        // Push: upsert every task, then replace its remote link set
        // wholesale. O(n) remote deletes per run is the cost of never
        // diffing link rows.
        let local = store.list_tasks().map_err(SyncError::from)?;
        let rows = local
            .iter()
            .map(|t| ChecklistRow::from_task(t, &self.user_id))
            .collect();
        self.remote.upsert_checklists(rows).await?;
        stats.pushed = local.len();

        for task in &local {
            self.remote.delete_checklist_links(task.id).await?;
            let links: Vec<ChecklistTagRow> = task
                .tag_ids
                .iter()
                .filter(|id| tags.contains_key(id))
                .map(|&tag_id| ChecklistTagRow {
                    checklist_id: task.id,
                    tag_id,
                })
                .collect();
            self.remote.upsert_checklist_links(links).await?;
            stats.links_replaced += 1;
        }

        // Pull
        let rows = self.remote.select_checklists(&self.user_id).await?;
        let mut links: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for link in self.remote.select_checklist_links().await? {
            links.entry(link.checklist_id).or_default().push(link.tag_id);
        }

        let by_id: HashMap<Uuid, SimpleTask> = local.into_iter().map(|t| (t.id, t)).collect();
        for row in rows {
            if pending.contains(&row.id) {
                continue;
            }
            let existing = by_id.get(&row.id);
            let mut merged = row.into_task(existing);
            merged.tag_ids = resolve_tag_set(links.remove(&merged.id).unwrap_or_default(), tags);

            if let Some(local) = existing {
                if same_content(local, &merged) {
                    stats.unchanged += 1;
                    continue;
                }
            }
            match store.save_task(&merged) {
                Ok(()) => {
                    if existing.is_some() {
                        stats.updated += 1;
                    } else {
                        stats.created += 1;
                    }
                }
                Err(e) => {
                    tracing::warn!(id = %merged.id, error = %e, "dropped local task write");
                    stats.local_write_failures += 1;
                }
            }
        }

        Ok(())
    }

    /// Milestone pass, including nested item reconciliation.
    async fn sync_milestones(
        &self,
        store: &mut SqliteStorage,
        tags: &HashMap<Uuid, Tag>,
        stats: &mut PassStats,
        item_stats: &mut ItemStats,
    ) -> SyncResult<()> {
        let pending = TombstoneTracker::new(store)
            .replay(&self.remote, &self.user_id, RemoteTable::Milestones, stats)
            .await?;
        let pending_items = TombstoneTracker::new(store)
            .replay(&self.remote, &self.user_id, RemoteTable::MilestoneItems, stats)
            .await?;

        // Push
        let local = store.list_milestones().map_err(SyncError::from)?;
        let rows = local
            .iter()
            .map(|m| MilestoneRow::from_milestone(m, &self.user_id))
            .collect();
        self.remote.upsert_milestones(rows).await?;
        stats.pushed = local.len();

        let item_rows: Vec<MilestoneItemRow> = local
            .iter()
            .flat_map(|m| m.items.iter().map(MilestoneItemRow::from_item))
            .collect();
        self.remote.upsert_milestone_items(item_rows).await?;

        for milestone in &local {
            self.remote.delete_milestone_links(milestone.id).await?;
            let links: Vec<MilestoneTagRow> = milestone
                .tag_ids
                .iter()
                .filter(|id| tags.contains_key(id))
                .map(|&tag_id| MilestoneTagRow {
                    milestone_id: milestone.id,
                    tag_id,
                })
                .collect();
            self.remote.upsert_milestone_links(links).await?;
            stats.links_replaced += 1;
        }

        // Pull
        let rows = self.remote.select_milestones(&self.user_id).await?;
        let mut items_by_parent: HashMap<Uuid, Vec<MilestoneItemRow>> = HashMap::new();
        for item in self.remote.select_milestone_items().await? {
            if pending_items.contains(&item.id) {
                continue;
            }
            items_by_parent.entry(item.milestone_id).or_default().push(item);
        }
        let mut links: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for link in self.remote.select_milestone_links().await? {
            links.entry(link.milestone_id).or_default().push(link.tag_id);
        }

        let by_id: HashMap<Uuid, Milestone> = local.into_iter().map(|m| (m.id, m)).collect();
        for row in rows {
            if pending.contains(&row.id) {
                continue;
            }
            let existing = by_id.get(&row.id);
            let mut merged = row.into_milestone(existing);
            merged.tag_ids = resolve_tag_set(links.remove(&merged.id).unwrap_or_default(), tags);

            // The remote item set is authoritative: the push phase of
            // this run already uploaded the local set, so anything
            // missing now was deleted elsewhere. Three-way diff instead
            // of a blind replace, because items are reconciled in place.
            let mut remote_items = items_by_parent.remove(&merged.id).unwrap_or_default();
            remote_items.sort_by(|a, b| a.position.cmp(&b.position).then(a.id.cmp(&b.id)));
            let remote_ids: HashSet<Uuid> = remote_items.iter().map(|r| r.id).collect();

            let local_items: HashMap<Uuid, &MilestoneItem> = existing
                .map(|m| m.items.iter().map(|i| (i.id, i)).collect())
                .unwrap_or_default();

            merged.items = Vec::with_capacity(remote_items.len());
            for item_row in remote_items {
                let item = item_row.into_item();
                match local_items.get(&item.id) {
                    Some(local_item) if **local_item == item => {}
                    Some(_) => item_stats.updated += 1,
                    None => item_stats.created += 1,
                }
                merged.items.push(item);
            }

            if let Some(local_m) = existing {
                for item in &local_m.items {
                    if !remote_ids.contains(&item.id) {
                        match store.remove_item_local(item.id) {
                            Ok(_) => item_stats.removed += 1,
                            Err(e) => {
                                tracing::warn!(id = %item.id, error = %e, "dropped local item removal");
                                stats.local_write_failures += 1;
                            }
                        }
                    }
                }
                if same_content(local_m, &merged) {
                    stats.unchanged += 1;
                    continue;
                }
            }

            match store.save_milestone(&merged) {
                Ok(()) => {
                    if existing.is_some() {
                        stats.updated += 1;
                    } else {
                        stats.created += 1;
                    }
                }
                Err(e) => {
                    tracing::warn!(id = %merged.id, error = %e, "dropped local milestone write");
                    stats.local_write_failures += 1;
                }
            }
        }

        Ok(())
    }
}

/// Resolve pulled link rows into a tag set: unknown tag ids are
/// dropped, the rest sorted by tag name (then id) to match local load
/// order, so hash comparison sees identical layouts.
fn resolve_tag_set(ids: Vec<Uuid>, tags: &HashMap<Uuid, Tag>) -> Vec<Uuid> {
    let mut set: Vec<Uuid> = ids.into_iter().filter(|id| tags.contains_key(id)).collect();
    set.sort_by(|a, b| tags[a].name.cmp(&tags[b].name).then(a.cmp(b)));
    set.dedup();
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::mock::MockRemote;
    use crate::sync::hash::content_hash;
    use std::sync::Arc;
    use std::time::Duration;

    const USER: &str = "user-1";

    fn engine_with(remote: MockRemote) -> SyncEngine<MockRemote> {
        SyncEngine::new(SqliteStorage::open_memory().unwrap(), remote, USER)
    }

    async fn local_digest(engine: &SyncEngine<MockRemote>) -> String {
        let store = engine.store().await;
        content_hash(&(
            store.list_tags().unwrap(),
            store.list_tasks().unwrap(),
            store.list_milestones().unwrap(),
        ))
    }

    fn remote_digest(remote: &MockRemote) -> String {
        remote.with_state(|s| {
            content_hash(&(
                s.tags.values().cloned().collect::<Vec<_>>(),
                s.checklists.values().cloned().collect::<Vec<_>>(),
                s.checklist_links.iter().copied().collect::<Vec<_>>(),
                s.milestones.values().cloned().collect::<Vec<_>>(),
                s.items.values().cloned().collect::<Vec<_>>(),
                s.milestone_links.iter().copied().collect::<Vec<_>>(),
            ))
        })
    }

    fn expect_completed(outcome: SyncOutcome) -> SyncSummary {
        match outcome {
            SyncOutcome::Completed(summary) => summary,
            SyncOutcome::AlreadyRunning => panic!("expected a completed run"),
        }
    }

    #[tokio::test]
    async fn test_run_twice_is_idempotent() {
        let remote = MockRemote::new();
        let engine = engine_with(remote.clone());

        {
            let mut store = engine.store().await;
            let tag = Tag::new("Work", "#FF8800");
            store.save_tag(&tag).unwrap();

            let mut task = SimpleTask::new("Email Sam");
            task.tag_ids = vec![tag.id];
            store.save_task(&task).unwrap();

            let mut m = Milestone::new("Launch");
            m.items.push(MilestoneItem::new(m.id, "docs", 0));
            m.items.push(MilestoneItem::new(m.id, "release", 1));
            store.save_milestone(&m).unwrap();
        }

        expect_completed(engine.run().await.unwrap());
        let local_first = local_digest(&engine).await;
        let remote_first = remote_digest(&remote);

        let summary = expect_completed(engine.run().await.unwrap());
        assert_eq!(local_digest(&engine).await, local_first);
        assert_eq!(remote_digest(&remote), remote_first);

        // The second run confirmed everything unchanged.
        assert_eq!(summary.tags.unchanged, 1);
        assert_eq!(summary.tasks.unchanged, 1);
        assert_eq!(summary.milestones.unchanged, 1);
        assert_eq!(summary.total_local_write_failures(), 0);
    }

    #[tokio::test]
    async fn test_removed_link_does_not_survive_remotely() {
        let remote = MockRemote::new();
        let engine = engine_with(remote.clone());

        let (task_id, keep_a, drop_b, keep_c) = {
            let mut store = engine.store().await;
            let a = Tag::new("a", "#111111");
            let b = Tag::new("b", "#222222");
            let c = Tag::new("c", "#333333");
            for tag in [&a, &b, &c] {
                store.save_tag(tag).unwrap();
            }
            let mut task = SimpleTask::new("Tagged");
            task.tag_ids = vec![a.id, b.id, c.id];
            store.save_task(&task).unwrap();
            (task.id, a.id, b.id, c.id)
        };

        expect_completed(engine.run().await.unwrap());
        assert_eq!(remote.with_state(|s| s.checklist_links.len()), 3);

        {
            let mut store = engine.store().await;
            let mut task = store.get_task(task_id).unwrap().unwrap();
            task.tag_ids.retain(|id| *id != drop_b);
            store.save_task(&task).unwrap();
        }
        expect_completed(engine.run().await.unwrap());

        let links = remote.with_state(|s| s.checklist_links.clone());
        assert_eq!(
            links,
            [(task_id, keep_a), (task_id, keep_c)].into_iter().collect()
        );
    }

    #[tokio::test]
    async fn test_milestone_deletion_propagates() {
        let remote = MockRemote::new();
        let engine = engine_with(remote.clone());

        let milestone_id = {
            let mut store = engine.store().await;
            let mut m = Milestone::new("Doomed");
            for (i, text) in ["a", "b", "c"].iter().enumerate() {
                m.items
                    .push(MilestoneItem::new(m.id, *text, i64::try_from(i).unwrap()));
            }
            store.save_milestone(&m).unwrap();
            m.id
        };
        expect_completed(engine.run().await.unwrap());
        assert_eq!(remote.with_state(|s| s.items.len()), 3);

        engine.store().await.delete_milestone(milestone_id).unwrap();
        let summary = expect_completed(engine.run().await.unwrap());

        assert_eq!(summary.milestones.deletes_replayed, 1);
        assert!(engine.store().await.get_milestone(milestone_id).unwrap().is_none());
        assert!(remote.with_state(|s| s.milestones.is_empty() && s.items.is_empty()));
        assert!(engine.store().await.pending_tombstones(None).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_remote_delete_retains_tombstone() {
        let remote = MockRemote::new();
        let engine = engine_with(remote.clone());

        let milestone_id = {
            let mut store = engine.store().await;
            let m = Milestone::new("Sticky");
            store.save_milestone(&m).unwrap();
            m.id
        };
        expect_completed(engine.run().await.unwrap());

        engine.store().await.delete_milestone(milestone_id).unwrap();
        remote.with_state(|s| s.fail_milestone_deletes = true);
        let summary = expect_completed(engine.run().await.unwrap());

        assert_eq!(summary.milestones.deletes_retained, 1);
        // Intent survives, and the pull did not resurrect the milestone.
        assert_eq!(engine.store().await.pending_tombstones(None).unwrap().len(), 1);
        assert!(engine.store().await.get_milestone(milestone_id).unwrap().is_none());

        // Next run delivers the delete.
        remote.with_state(|s| s.fail_milestone_deletes = false);
        let summary = expect_completed(engine.run().await.unwrap());
        assert_eq!(summary.milestones.deletes_replayed, 1);
        assert!(engine.store().await.pending_tombstones(None).unwrap().is_empty());
        assert!(remote.with_state(|s| s.milestones.is_empty()));
    }

    #[tokio::test]
    async fn test_wiped_store_is_rebuilt_from_remote() {
        let remote = MockRemote::new();
        let engine = engine_with(remote.clone());

        let (tag_id, task_id) = {
            let mut store = engine.store().await;
            let tag = Tag::new("Work", "#FF8800");
            store.save_tag(&tag).unwrap();
            let mut task = SimpleTask::new("Write report");
            task.tag_ids = vec![tag.id];
            store.save_task(&task).unwrap();
            (tag.id, task.id)
        };
        expect_completed(engine.run().await.unwrap());

        // A fresh device: empty local store, same account.
        let fresh = engine_with(remote.clone());
        let summary = expect_completed(fresh.run().await.unwrap());
        assert_eq!(summary.tags.created, 1);
        assert_eq!(summary.tasks.created, 1);

        let store = fresh.store().await;
        let tag = store.get_tag(tag_id).unwrap().unwrap();
        assert_eq!(tag.name, "Work");
        let task = store.get_task(task_id).unwrap().unwrap();
        assert_eq!(task.title, "Write report");
        assert_eq!(task.tag_ids, vec![tag_id]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_second_concurrent_run_is_dropped() {
        let remote = MockRemote::new();
        remote.with_state(|s| s.call_delay = Some(Duration::from_millis(80)));
        let engine = Arc::new(engine_with(remote.clone()));

        let first = tokio::spawn({
            let engine = Arc::clone(&engine);
            async move { engine.run().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(engine.status().is_running);
        let second = engine.run().await.unwrap();
        assert!(matches!(second, SyncOutcome::AlreadyRunning));
        let calls_at_rejection = remote.network_calls();

        let first = first.await.unwrap().unwrap();
        assert!(matches!(first, SyncOutcome::Completed(_)));
        assert!(!engine.status().is_running);
        // The rejected call performed no network work of its own: every
        // call before and after the rejection belongs to the first run.
        assert!(calls_at_rejection < remote.network_calls());
    }

    #[tokio::test]
    async fn test_item_diff_converges_to_remote_set() {
        let remote = MockRemote::new();
        let engine = engine_with(remote.clone());

        let (milestone_id, item1_id) = {
            let mut store = engine.store().await;
            let mut m = Milestone::new("Trip");
            m.items.push(MilestoneItem::new(m.id, "a", 0));
            m.items.push(MilestoneItem::new(m.id, "b", 1));
            store.save_milestone(&m).unwrap();
            (m.id, m.items[0].id)
        };
        expect_completed(engine.run().await.unwrap());

        // Another device deleted item "b" and created item "c"; make the
        // pull see exactly that set, regardless of what this run pushed.
        let item3 = MilestoneItemRow {
            id: Uuid::new_v4(),
            milestone_id,
            text: "c".to_string(),
            is_done: false,
            position: 1,
        };
        let item1 = MilestoneItemRow {
            id: item1_id,
            milestone_id,
            text: "a".to_string(),
            is_done: false,
            position: 0,
        };
        remote.with_state(|s| {
            s.items_select_override = Some(vec![item1, item3.clone()]);
        });

        let summary = expect_completed(engine.run().await.unwrap());
        assert_eq!(summary.items.created, 1);
        assert_eq!(summary.items.removed, 1);

        let store = engine.store().await;
        let m = store.get_milestone(milestone_id).unwrap().unwrap();
        let got: Vec<(Uuid, String)> = m.items.iter().map(|i| (i.id, i.text.clone())).collect();
        assert_eq!(
            got,
            vec![(item1_id, "a".to_string()), (item3.id, "c".to_string())]
        );
    }

    #[tokio::test]
    async fn test_failed_pass_aborts_run_and_surfaces_error() {
        let remote = MockRemote::new();
        let engine = engine_with(remote.clone());
        {
            let mut store = engine.store().await;
            store.save_task(&SimpleTask::new("Never pushed")).unwrap();
        }
        remote.with_state(|s| s.fail_tag_selects = true);

        let err = engine.run().await.unwrap_err();
        assert!(err.is_transient());
        // Tags pass died on select; the task pass never touched the wire.
        assert_eq!(remote.network_calls(), 2);
        assert!(remote.with_state(|s| s.checklists.is_empty()));

        let status = engine.status();
        assert!(!status.is_running);
        assert!(status.last_error.is_some());
        assert!(status.last_success_at.is_none());

        // A later healthy run clears the error.
        remote.with_state(|s| s.fail_tag_selects = false);
        expect_completed(engine.run().await.unwrap());
        let status = engine.status();
        assert!(status.last_error.is_none());
        assert!(status.last_success_at.is_some());
    }

    #[tokio::test]
    async fn test_merge_remote_progress_ratchets() {
        let engine = engine_with(MockRemote::new());
        {
            let mut store = engine.store().await;
            let mut local = GamificationState::default();
            local.award(40);
            local.achievements.insert("first_task".to_string());
            store.set_gamification(&local).unwrap();
        }

        let remote_counters = GamificationState {
            exp: 25,
            level: 2,
            achievements: ["streak_3".to_string()].into_iter().collect(),
        };
        let (counters, _) = engine
            .merge_remote_progress(&remote_counters, &StreakState::default())
            .await
            .unwrap();

        assert_eq!(counters.exp, 40);
        assert_eq!(counters.level, 2);
        assert!(counters.achievements.contains("first_task"));
        assert!(counters.achievements.contains("streak_3"));
        assert_eq!(engine.store().await.gamification().unwrap(), counters);
    }
}
