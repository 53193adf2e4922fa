//! SQLite storage implementation.
//!
//! The local store is the primary source of truth for user interaction;
//! sync reconciles it against the remote store afterwards. Mutations run
//! through [`SqliteStorage::mutate`] so that multi-statement changes
//! (in particular tombstone-write plus entity-delete) commit atomically.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Transaction};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::{
    GamificationState, Milestone, MilestoneItem, RecurrenceRule, RemoteTable, SimpleTask,
    StreakState, Tag, TextColor, Tombstone,
};
use crate::storage::schema::apply_schema;

/// SQLite-based storage backend.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

/// Convert a stored UUID string, surfacing corruption as a SQL error.
fn column_uuid(idx: usize, s: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Convert a stored recurrence rule string.
fn column_rule(idx: usize, s: Option<String>) -> rusqlite::Result<Option<RecurrenceRule>> {
    match s {
        None => Ok(None),
        Some(text) => text.parse().map(Some).map_err(|e: String| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                e.into(),
            )
        }),
    }
}

impl SqliteStorage {
    /// Open a database at the given path.
    ///
    /// Creates the database and applies schema if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, None)
    }

    /// Open a database with an optional busy timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open_with_timeout(path: &Path, timeout_ms: Option<u64>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_millis(timeout_ms.unwrap_or(5_000)))?;
        conn.pragma_update(None, "foreign_keys", true)?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", true)?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection (for read operations).
    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Execute a mutation inside an IMMEDIATE transaction.
    ///
    /// The closure either commits as a whole or not at all. This is the
    /// commit point the deletion contract depends on: a tombstone and
    /// its entity removal always land together.
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails; the transaction is rolled back.
    pub fn mutate<F, R>(&mut self, op: &str, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction) -> Result<R>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        let result = f(&tx)?;
        tx.commit()?;
        tracing::debug!(op, "mutation committed");
        Ok(result)
    }

    // ==================
    // Tag Operations
    // ==================

    /// All tags, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_tags(&self) -> Result<Vec<Tag>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, color_hex, text_color, updated_at FROM tags ORDER BY name",
        )?;
        let tags = stmt
            .query_map([], row_to_tag)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tags)
    }

    /// Look up one tag by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_tag(&self, id: Uuid) -> Result<Option<Tag>> {
        let tag = self
            .conn
            .query_row(
                "SELECT id, name, color_hex, text_color, updated_at FROM tags WHERE id = ?1",
                params![id.to_string()],
                row_to_tag,
            )
            .optional()?;
        Ok(tag)
    }

    /// Insert or update a tag, keyed by its permanent id.
    ///
    /// # Errors
    ///
    /// Returns an error if the upsert fails.
    pub fn save_tag(&mut self, tag: &Tag) -> Result<()> {
        self.conn.execute(
            "INSERT INTO tags (id, name, color_hex, text_color, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 color_hex = excluded.color_hex,
                 text_color = excluded.text_color,
                 updated_at = excluded.updated_at",
            params![
                tag.id.to_string(),
                tag.name,
                tag.color_hex,
                tag.text_color.to_string(),
                tag.updated_at
            ],
        )?;
        Ok(())
    }

    /// Delete a tag, writing its tombstone in the same transaction.
    ///
    /// Link rows referencing the tag cascade away. Returns `false` if
    /// the tag did not exist (no tombstone is written).
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails.
    pub fn delete_tag(&mut self, id: Uuid) -> Result<bool> {
        self.mutate("tag_delete", |tx| {
            delete_with_tombstone(tx, "tags", RemoteTable::Tags, id)
        })
    }

    // ==================
    // Task Operations
    // ==================

    /// All tasks with their tag links, sorted by manual order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_tasks(&self) -> Result<Vec<SimpleTask>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, notes, due_date, remind, is_done, is_starred, user_order,
                    recurrence_rule, completed_at, updated_at
             FROM tasks ORDER BY user_order, updated_at",
        )?;
        let mut tasks = stmt
            .query_map([], row_to_task)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut links = self.link_map("task_tags", "task_id")?;
        for task in &mut tasks {
            task.tag_ids = links.remove(&task.id).unwrap_or_default();
        }
        Ok(tasks)
    }

    /// Look up one task (with tag links) by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_task(&self, id: Uuid) -> Result<Option<SimpleTask>> {
        let task = self
            .conn
            .query_row(
                "SELECT id, title, notes, due_date, remind, is_done, is_starred, user_order,
                        recurrence_rule, completed_at, updated_at
                 FROM tasks WHERE id = ?1",
                params![id.to_string()],
                row_to_task,
            )
            .optional()?;

        match task {
            None => Ok(None),
            Some(mut task) => {
                task.tag_ids = self.entity_tag_ids("task_tags", "task_id", id)?;
                Ok(Some(task))
            }
        }
    }

    /// Insert or update a task, replacing its local tag links wholesale.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails.
    pub fn save_task(&mut self, task: &SimpleTask) -> Result<()> {
        self.mutate("task_save", |tx| {
            tx.execute(
                "INSERT INTO tasks (id, title, notes, due_date, remind, is_done, is_starred,
                                    user_order, recurrence_rule, completed_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                 ON CONFLICT(id) DO UPDATE SET
                     title = excluded.title,
                     notes = excluded.notes,
                     due_date = excluded.due_date,
                     remind = excluded.remind,
                     is_done = excluded.is_done,
                     is_starred = excluded.is_starred,
                     user_order = excluded.user_order,
                     recurrence_rule = excluded.recurrence_rule,
                     completed_at = excluded.completed_at,
                     updated_at = excluded.updated_at",
                params![
                    task.id.to_string(),
                    task.title,
                    task.notes,
                    task.due_date,
                    task.remind,
                    task.is_done,
                    task.is_starred,
                    task.order,
                    task.recurrence.map(|r| r.as_str().to_string()),
                    task.completed_at,
                    task.updated_at
                ],
            )?;

            replace_links(tx, "task_tags", "task_id", task.id, &task.tag_ids)?;
            Ok(())
        })
    }

    /// Delete a task, writing its tombstone in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails.
    pub fn delete_task(&mut self, id: Uuid) -> Result<bool> {
        self.mutate("task_delete", |tx| {
            delete_with_tombstone(tx, "tasks", RemoteTable::Checklists, id)
        })
    }

    // ==================
    // Milestone Operations
    // ==================

    /// All milestones with items and tag links, sorted by manual order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_milestones(&self) -> Result<Vec<Milestone>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, notes, created_at, due_date, remind, is_done, is_starred,
                    user_order, recurrence_rule, completed_at, updated_at
             FROM milestones ORDER BY user_order, created_at",
        )?;
        let mut milestones = stmt
            .query_map([], row_to_milestone)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut links = self.link_map("milestone_tags", "milestone_id")?;
        let mut items = self.all_items_by_parent()?;
        for m in &mut milestones {
            m.tag_ids = links.remove(&m.id).unwrap_or_default();
            m.items = items.remove(&m.id).unwrap_or_default();
        }
        Ok(milestones)
    }

    /// Look up one milestone (with items and tag links) by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_milestone(&self, id: Uuid) -> Result<Option<Milestone>> {
        let milestone = self
            .conn
            .query_row(
                "SELECT id, title, notes, created_at, due_date, remind, is_done, is_starred,
                        user_order, recurrence_rule, completed_at, updated_at
                 FROM milestones WHERE id = ?1",
                params![id.to_string()],
                row_to_milestone,
            )
            .optional()?;

        match milestone {
            None => Ok(None),
            Some(mut m) => {
                m.tag_ids = self.entity_tag_ids("milestone_tags", "milestone_id", id)?;
                m.items = self.items_for(id)?;
                Ok(Some(m))
            }
        }
    }

    /// Insert or update a milestone: scalars, tag links, and the items
    /// carried on the struct.
    ///
    /// Items are upserted by id; items present locally but absent from
    /// the struct are left alone; explicit deletion goes through
    /// [`Self::delete_item`] (user intent, tombstoned) or
    /// [`Self::remove_item_local`] (pull reconciliation, not tombstoned).
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails.
    pub fn save_milestone(&mut self, milestone: &Milestone) -> Result<()> {
        self.mutate("milestone_save", |tx| {
            tx.execute(
                "INSERT INTO milestones (id, title, notes, created_at, due_date, remind, is_done,
                                         is_starred, user_order, recurrence_rule, completed_at,
                                         updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                 ON CONFLICT(id) DO UPDATE SET
                     title = excluded.title,
                     notes = excluded.notes,
                     created_at = excluded.created_at,
                     due_date = excluded.due_date,
                     remind = excluded.remind,
                     is_done = excluded.is_done,
                     is_starred = excluded.is_starred,
                     user_order = excluded.user_order,
                     recurrence_rule = excluded.recurrence_rule,
                     completed_at = excluded.completed_at,
                     updated_at = excluded.updated_at",
                params![
                    milestone.id.to_string(),
                    milestone.title,
                    milestone.notes,
                    milestone.created_at,
                    milestone.due_date,
                    milestone.remind,
                    milestone.is_done,
                    milestone.is_starred,
                    milestone.order,
                    milestone.recurrence.map(|r| r.as_str().to_string()),
                    milestone.completed_at,
                    milestone.updated_at
                ],
            )?;

            replace_links(tx, "milestone_tags", "milestone_id", milestone.id, &milestone.tag_ids)?;

            for item in &milestone.items {
                upsert_item(tx, item)?;
            }
            Ok(())
        })
    }

    /// Insert or update a single milestone item.
    ///
    /// # Errors
    ///
    /// Returns an error if the upsert fails.
    pub fn save_item(&mut self, item: &MilestoneItem) -> Result<()> {
        self.mutate("item_save", |tx| {
            upsert_item(tx, item)?;
            Ok(())
        })
    }

    /// Delete a milestone and (by cascade) its items and tag links,
    /// writing the milestone tombstone in the same transaction.
    ///
    /// Item rows need no tombstones of their own: the remote delete of
    /// the milestone cascades server-side exactly as it does locally.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails.
    pub fn delete_milestone(&mut self, id: Uuid) -> Result<bool> {
        self.mutate("milestone_delete", |tx| {
            delete_with_tombstone(tx, "milestones", RemoteTable::Milestones, id)
        })
    }

    /// Delete a single item on user intent, with a tombstone.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails.
    pub fn delete_item(&mut self, id: Uuid) -> Result<bool> {
        self.mutate("item_delete", |tx| {
            delete_with_tombstone(tx, "milestone_items", RemoteTable::MilestoneItems, id)
        })
    }

    /// Remove an item locally without a tombstone.
    ///
    /// Used by the pull phase when the remote item set is authoritative:
    /// the row is already gone remotely, so no delete intent is owed.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn remove_item_local(&mut self, id: Uuid) -> Result<bool> {
        let n = self.conn.execute(
            "DELETE FROM milestone_items WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(n > 0)
    }

    // ==================
    // Tombstone Operations
    // ==================

    /// Pending delete intents, optionally filtered by remote table.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn pending_tombstones(&self, table: Option<RemoteTable>) -> Result<Vec<Tombstone>> {
        let mut out = Vec::new();
        let mut push_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<()> {
            let table_name: String = row.get(2)?;
            out.push(Tombstone {
                id: column_uuid(0, &row.get::<_, String>(0)?)?,
                target_id: column_uuid(1, &row.get::<_, String>(1)?)?,
                table: table_name.parse().map_err(|e: String| {
                    rusqlite::Error::FromSqlConversionFailure(
                        2,
                        rusqlite::types::Type::Text,
                        e.into(),
                    )
                })?,
                deleted_at: row.get(3)?,
            });
            Ok(())
        };

        match table {
            Some(t) => {
                let mut stmt = self.conn.prepare(
                    "SELECT id, target_id, table_name, deleted_at FROM tombstones
                     WHERE table_name = ?1 ORDER BY deleted_at",
                )?;
                let mut rows = stmt.query(params![t.as_str()])?;
                while let Some(row) = rows.next()? {
                    push_row(row)?;
                }
            }
            None => {
                let mut stmt = self.conn.prepare(
                    "SELECT id, target_id, table_name, deleted_at FROM tombstones
                     ORDER BY deleted_at",
                )?;
                let mut rows = stmt.query([])?;
                while let Some(row) = rows.next()? {
                    push_row(row)?;
                }
            }
        }
        Ok(out)
    }

    /// Clear tombstones after their remote deletes succeeded.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn clear_tombstones(&mut self, ids: &[Uuid]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("DELETE FROM tombstones WHERE id IN ({placeholders})");
        self.conn
            .execute(&sql, params_from_iter(ids.iter().map(Uuid::to_string)))?;
        Ok(())
    }

    // ==================
    // Counter Operations
    // ==================

    /// Load the gamification counters (defaults if never written).
    ///
    /// # Errors
    ///
    /// Returns an error if the query or achievements decode fails.
    pub fn gamification(&self) -> Result<GamificationState> {
        let row = self
            .conn
            .query_row(
                "SELECT exp, level, achievements FROM progress WHERE id = 1",
                [],
                |r| {
                    Ok((
                        r.get::<_, i64>(0)?,
                        r.get::<_, i64>(1)?,
                        r.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        match row {
            None => Ok(GamificationState::default()),
            Some((exp, level, achievements_json)) => Ok(GamificationState {
                exp,
                level,
                achievements: serde_json::from_str(&achievements_json)?,
            }),
        }
    }

    /// Persist the gamification counters.
    ///
    /// # Errors
    ///
    /// Returns an error if the upsert or achievements encode fails.
    pub fn set_gamification(&mut self, state: &GamificationState) -> Result<()> {
        let achievements = serde_json::to_string(&state.achievements)?;
        self.conn.execute(
            "INSERT INTO progress (id, exp, level, achievements) VALUES (1, ?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
                 exp = excluded.exp,
                 level = excluded.level,
                 achievements = excluded.achievements",
            params![state.exp, state.level, achievements],
        )?;
        Ok(())
    }

    /// Load the streak state (defaults if never written).
    ///
    /// # Errors
    ///
    /// Returns an error if the query or date parse fails.
    pub fn streak(&self) -> Result<StreakState> {
        let row = self
            .conn
            .query_row(
                "SELECT count, last_active_date FROM streak WHERE id = 1",
                [],
                |r| Ok((r.get::<_, i64>(0)?, r.get::<_, Option<String>>(1)?)),
            )
            .optional()?;

        match row {
            None => Ok(StreakState::default()),
            Some((count, date)) => {
                let last_active_date = match date {
                    None => None,
                    Some(text) => Some(
                        text.parse()
                            .map_err(|e| Error::Other(format!("bad streak date: {e}")))?,
                    ),
                };
                Ok(StreakState {
                    count,
                    last_active_date,
                })
            }
        }
    }

    /// Persist the streak state.
    ///
    /// # Errors
    ///
    /// Returns an error if the upsert fails.
    pub fn set_streak(&mut self, state: &StreakState) -> Result<()> {
        self.conn.execute(
            "INSERT INTO streak (id, count, last_active_date) VALUES (1, ?1, ?2)
             ON CONFLICT(id) DO UPDATE SET
                 count = excluded.count,
                 last_active_date = excluded.last_active_date",
            params![
                state.count,
                state.last_active_date.map(|d| d.to_string())
            ],
        )?;
        Ok(())
    }

    /// Lifetime completed-task count, for achievement thresholds.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn completed_task_count(&self) -> Result<i64> {
        let n = self.conn.query_row(
            "SELECT COUNT(*) FROM tasks WHERE is_done = 1 OR completed_at IS NOT NULL",
            [],
            |r| r.get(0),
        )?;
        Ok(n)
    }

    /// Lifetime completed-milestone count, for achievement thresholds.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn completed_milestone_count(&self) -> Result<i64> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM milestones WHERE is_done = 1", [], |r| {
                r.get(0)
            })?;
        Ok(n)
    }

    /// Next manual sort position for a new row in `table`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn next_order(&self, table: OrderedTable) -> Result<i64> {
        let sql = match table {
            OrderedTable::Tasks => "SELECT COALESCE(MAX(user_order), -1) + 1 FROM tasks",
            OrderedTable::Milestones => "SELECT COALESCE(MAX(user_order), -1) + 1 FROM milestones",
        };
        let n = self.conn.query_row(sql, [], |r| r.get(0))?;
        Ok(n)
    }

    /// Resolve a full or prefix id against `table`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when the prefix is ambiguous; `Ok(None)` when
    /// nothing matches.
    pub fn resolve_id(&self, table: IdTable, prefix: &str) -> Result<Option<Uuid>> {
        let sql = format!(
            "SELECT id FROM {} WHERE id LIKE ?1 LIMIT 3",
            table.table_name()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let ids = stmt
            .query_map(params![format!("{prefix}%")], |r| r.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        match ids.as_slice() {
            [] => Ok(None),
            [only] => Ok(Some(column_uuid(0, only).map_err(Error::Database)?)),
            _ => Err(Error::InvalidArgument(format!(
                "id prefix '{prefix}' is ambiguous"
            ))),
        }
    }

    // ==================
    // Internal helpers
    // ==================

    /// tag_ids per entity from a link table, ordered by tag name for
    /// stable output.
    fn link_map(&self, table: &str, owner_col: &str) -> Result<HashMap<Uuid, Vec<Uuid>>> {
        let sql = format!(
            "SELECT l.{owner_col}, l.tag_id FROM {table} l
             JOIN tags t ON t.id = l.tag_id
             ORDER BY t.name, l.tag_id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut map: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let owner = column_uuid(0, &row.get::<_, String>(0)?)?;
            let tag = column_uuid(1, &row.get::<_, String>(1)?)?;
            map.entry(owner).or_default().push(tag);
        }
        Ok(map)
    }

    fn entity_tag_ids(&self, table: &str, owner_col: &str, owner: Uuid) -> Result<Vec<Uuid>> {
        let sql = format!(
            "SELECT l.tag_id FROM {table} l
             JOIN tags t ON t.id = l.tag_id
             WHERE l.{owner_col} = ?1 ORDER BY t.name, l.tag_id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let ids = stmt
            .query_map(params![owner.to_string()], |r| r.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        ids.iter()
            .map(|s| column_uuid(0, s).map_err(Error::Database))
            .collect()
    }

    fn items_for(&self, milestone_id: Uuid) -> Result<Vec<MilestoneItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, milestone_id, text, is_done, position FROM milestone_items
             WHERE milestone_id = ?1 ORDER BY position, id",
        )?;
        let items = stmt
            .query_map(params![milestone_id.to_string()], row_to_item)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    fn all_items_by_parent(&self) -> Result<HashMap<Uuid, Vec<MilestoneItem>>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, milestone_id, text, is_done, position FROM milestone_items
             ORDER BY position, id",
        )?;
        let mut map: HashMap<Uuid, Vec<MilestoneItem>> = HashMap::new();
        let items = stmt
            .query_map([], row_to_item)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        for item in items {
            map.entry(item.milestone_id).or_default().push(item);
        }
        Ok(map)
    }
}

/// Table names accepting a manual sort order.
#[derive(Debug, Clone, Copy)]
pub enum OrderedTable {
    Tasks,
    Milestones,
}

/// Tables `resolve_id` can address.
#[derive(Debug, Clone, Copy)]
pub enum IdTable {
    Tags,
    Tasks,
    Milestones,
    MilestoneItems,
}

impl IdTable {
    const fn table_name(self) -> &'static str {
        match self {
            Self::Tags => "tags",
            Self::Tasks => "tasks",
            Self::Milestones => "milestones",
            Self::MilestoneItems => "milestone_items",
        }
    }
}

// ==================
// Row mapping
// ==================

fn row_to_tag(row: &rusqlite::Row<'_>) -> rusqlite::Result<Tag> {
    let text_color: String = row.get(3)?;
    Ok(Tag {
        id: column_uuid(0, &row.get::<_, String>(0)?)?,
        name: row.get(1)?,
        color_hex: row.get(2)?,
        text_color: text_color.parse().unwrap_or(TextColor::Auto),
        updated_at: row.get(4)?,
    })
}

fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<SimpleTask> {
    Ok(SimpleTask {
        id: column_uuid(0, &row.get::<_, String>(0)?)?,
        title: row.get(1)?,
        notes: row.get(2)?,
        due_date: row.get(3)?,
        remind: row.get(4)?,
        is_done: row.get(5)?,
        is_starred: row.get(6)?,
        order: row.get(7)?,
        recurrence: column_rule(8, row.get(8)?)?,
        completed_at: row.get(9)?,
        updated_at: row.get(10)?,
        tag_ids: Vec::new(),
    })
}

fn row_to_milestone(row: &rusqlite::Row<'_>) -> rusqlite::Result<Milestone> {
    Ok(Milestone {
        id: column_uuid(0, &row.get::<_, String>(0)?)?,
        title: row.get(1)?,
        notes: row.get(2)?,
        created_at: row.get(3)?,
        due_date: row.get(4)?,
        remind: row.get(5)?,
        is_done: row.get(6)?,
        is_starred: row.get(7)?,
        order: row.get(8)?,
        recurrence: column_rule(9, row.get(9)?)?,
        completed_at: row.get(10)?,
        updated_at: row.get(11)?,
        tag_ids: Vec::new(),
        items: Vec::new(),
    })
}

fn row_to_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<MilestoneItem> {
    Ok(MilestoneItem {
        id: column_uuid(0, &row.get::<_, String>(0)?)?,
        milestone_id: column_uuid(1, &row.get::<_, String>(1)?)?,
        text: row.get(2)?,
        is_done: row.get(3)?,
        position: row.get(4)?,
    })
}

// ==================
// Transaction helpers
// ==================

/// Delete `id` from `local_table`, writing a tombstone for the matching
/// remote table first. No-op (and no tombstone) if the row is absent.
fn delete_with_tombstone(
    tx: &Transaction,
    local_table: &str,
    remote: RemoteTable,
    id: Uuid,
) -> Result<bool> {
    let exists_sql = format!("SELECT 1 FROM {local_table} WHERE id = ?1");
    let exists = tx
        .query_row(&exists_sql, params![id.to_string()], |_| Ok(()))
        .optional()?
        .is_some();
    if !exists {
        return Ok(false);
    }

    let tombstone = Tombstone::new(id, remote);
    tx.execute(
        "INSERT INTO tombstones (id, target_id, table_name, deleted_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            tombstone.id.to_string(),
            tombstone.target_id.to_string(),
            tombstone.table.as_str(),
            tombstone.deleted_at
        ],
    )?;

    let delete_sql = format!("DELETE FROM {local_table} WHERE id = ?1");
    tx.execute(&delete_sql, params![id.to_string()])?;
    Ok(true)
}

fn replace_links(
    tx: &Transaction,
    table: &str,
    owner_col: &str,
    owner: Uuid,
    tag_ids: &[Uuid],
) -> Result<()> {
    let delete_sql = format!("DELETE FROM {table} WHERE {owner_col} = ?1");
    tx.execute(&delete_sql, params![owner.to_string()])?;

    let insert_sql = format!("INSERT OR IGNORE INTO {table} ({owner_col}, tag_id) VALUES (?1, ?2)");
    for tag_id in tag_ids {
        tx.execute(&insert_sql, params![owner.to_string(), tag_id.to_string()])?;
    }
    Ok(())
}

fn upsert_item(tx: &Transaction, item: &MilestoneItem) -> Result<()> {
    tx.execute(
        "INSERT INTO milestone_items (id, milestone_id, text, is_done, position)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(id) DO UPDATE SET
             milestone_id = excluded.milestone_id,
             text = excluded.text,
             is_done = excluded.is_done,
             position = excluded.position",
        params![
            item.id.to_string(),
            item.milestone_id.to_string(),
            item.text,
            item.is_done,
            item.position
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::now_ms;

    fn store() -> SqliteStorage {
        SqliteStorage::open_memory().unwrap()
    }

    #[test]
    fn test_tag_crud_round_trip() {
        let mut storage = store();
        let mut tag = Tag::new("Work", "#FF8800");
        storage.save_tag(&tag).unwrap();

        tag.name = "Office".to_string();
        storage.save_tag(&tag).unwrap();

        let loaded = storage.get_tag(tag.id).unwrap().unwrap();
        assert_eq!(loaded.name, "Office");
        assert_eq!(storage.list_tags().unwrap().len(), 1);
    }

    #[test]
    fn test_task_links_replace_wholesale() {
        let mut storage = store();
        let a = Tag::new("a", "#111111");
        let b = Tag::new("b", "#222222");
        storage.save_tag(&a).unwrap();
        storage.save_tag(&b).unwrap();

        let mut task = SimpleTask::new("Email Sam");
        task.tag_ids = vec![a.id, b.id];
        storage.save_task(&task).unwrap();
        assert_eq!(storage.get_task(task.id).unwrap().unwrap().tag_ids.len(), 2);

        task.tag_ids = vec![b.id];
        storage.save_task(&task).unwrap();
        assert_eq!(
            storage.get_task(task.id).unwrap().unwrap().tag_ids,
            vec![b.id]
        );
    }

    #[test]
    fn test_delete_writes_tombstone_atomically() {
        let mut storage = store();
        let task = SimpleTask::new("Doomed");
        storage.save_task(&task).unwrap();

        assert!(storage.delete_task(task.id).unwrap());
        assert!(storage.get_task(task.id).unwrap().is_none());

        let pending = storage
            .pending_tombstones(Some(RemoteTable::Checklists))
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].target_id, task.id);

        // Deleting a missing row leaves no spurious tombstone.
        assert!(!storage.delete_task(task.id).unwrap());
        assert_eq!(storage.pending_tombstones(None).unwrap().len(), 1);

        storage.clear_tombstones(&[pending[0].id]).unwrap();
        assert!(storage.pending_tombstones(None).unwrap().is_empty());
    }

    #[test]
    fn test_milestone_delete_cascades_items() {
        let mut storage = store();
        let mut m = Milestone::new("Launch");
        m.items.push(MilestoneItem::new(m.id, "a", 0));
        m.items.push(MilestoneItem::new(m.id, "b", 1));
        m.items.push(MilestoneItem::new(m.id, "c", 2));
        storage.save_milestone(&m).unwrap();
        assert_eq!(storage.get_milestone(m.id).unwrap().unwrap().items.len(), 3);

        assert!(storage.delete_milestone(m.id).unwrap());
        assert!(storage.get_milestone(m.id).unwrap().is_none());

        // Items cascaded away without their own tombstones.
        let count: i64 = storage
            .conn()
            .query_row("SELECT COUNT(*) FROM milestone_items", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
        let pending = storage.pending_tombstones(None).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].table, RemoteTable::Milestones);
    }

    #[test]
    fn test_remove_item_local_leaves_no_tombstone() {
        let mut storage = store();
        let mut m = Milestone::new("Trip");
        let item = MilestoneItem::new(m.id, "book flights", 0);
        m.items.push(item.clone());
        storage.save_milestone(&m).unwrap();

        assert!(storage.remove_item_local(item.id).unwrap());
        assert!(storage.pending_tombstones(None).unwrap().is_empty());
    }

    #[test]
    fn test_counters_default_and_round_trip() {
        let mut storage = store();
        assert_eq!(storage.gamification().unwrap(), GamificationState::default());

        let mut state = GamificationState::default();
        state.award(120);
        state.achievements.insert("first_task".to_string());
        storage.set_gamification(&state).unwrap();
        assert_eq!(storage.gamification().unwrap(), state);

        let streak = StreakState {
            count: 4,
            last_active_date: chrono::NaiveDate::from_ymd_opt(2025, 6, 2),
        };
        storage.set_streak(&streak).unwrap();
        assert_eq!(storage.streak().unwrap(), streak);
    }

    #[test]
    fn test_resolve_id_prefix() {
        let mut storage = store();
        let task = SimpleTask::new("Only one");
        storage.save_task(&task).unwrap();

        let prefix = &task.id.to_string()[..8];
        let resolved = storage
            .resolve_id(IdTable::Tasks, prefix)
            .unwrap();
        assert_eq!(resolved, Some(task.id));

        assert_eq!(
            storage
                .resolve_id(IdTable::Tasks, "zzzzzzzz")
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_next_order_increments() {
        let mut storage = store();
        assert_eq!(storage.next_order(OrderedTable::Tasks).unwrap(), 0);

        let mut task = SimpleTask::new("first");
        task.order = 0;
        task.updated_at = now_ms();
        storage.save_task(&task).unwrap();
        assert_eq!(storage.next_order(OrderedTable::Tasks).unwrap(), 1);
    }
}
