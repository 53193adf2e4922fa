//! Database schema definitions and migration tracking.

use rusqlite::{Connection, Result};

/// Current schema version for migration tracking.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// The complete SQLite schema for the Stride database.
///
/// Timestamps are stored as INTEGER Unix milliseconds; dates (streak)
/// as ISO `YYYY-MM-DD` TEXT. Ids are UUID strings, the same id the
/// remote store uses, forever.
pub const SCHEMA_SQL: &str = r"
-- ====================
-- Schema Version Tracking
-- ====================

CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at INTEGER NOT NULL
);

-- ====================
-- Entities
-- ====================

CREATE TABLE IF NOT EXISTS tags (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    color_hex TEXT NOT NULL,
    text_color TEXT NOT NULL DEFAULT 'auto',
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    notes TEXT,
    due_date INTEGER,
    remind INTEGER NOT NULL DEFAULT 0,
    is_done INTEGER NOT NULL DEFAULT 0,
    is_starred INTEGER NOT NULL DEFAULT 0,
    user_order INTEGER NOT NULL DEFAULT 0,
    recurrence_rule TEXT,
    completed_at INTEGER,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_tasks_order ON tasks(user_order);
CREATE INDEX IF NOT EXISTS idx_tasks_done ON tasks(is_done);

CREATE TABLE IF NOT EXISTS task_tags (
    task_id TEXT NOT NULL,
    tag_id TEXT NOT NULL,
    PRIMARY KEY (task_id, tag_id),
    FOREIGN KEY (task_id) REFERENCES tasks(id) ON DELETE CASCADE,
    FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_task_tags_tag ON task_tags(tag_id);

CREATE TABLE IF NOT EXISTS milestones (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    notes TEXT,
    created_at INTEGER NOT NULL,
    due_date INTEGER,
    remind INTEGER NOT NULL DEFAULT 0,
    is_done INTEGER NOT NULL DEFAULT 0,
    is_starred INTEGER NOT NULL DEFAULT 0,
    user_order INTEGER NOT NULL DEFAULT 0,
    recurrence_rule TEXT,
    completed_at INTEGER,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_milestones_order ON milestones(user_order);

CREATE TABLE IF NOT EXISTS milestone_items (
    id TEXT PRIMARY KEY,
    milestone_id TEXT NOT NULL,
    text TEXT NOT NULL,
    is_done INTEGER NOT NULL DEFAULT 0,
    position INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (milestone_id) REFERENCES milestones(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_milestone_items_parent ON milestone_items(milestone_id);

CREATE TABLE IF NOT EXISTS milestone_tags (
    milestone_id TEXT NOT NULL,
    tag_id TEXT NOT NULL,
    PRIMARY KEY (milestone_id, tag_id),
    FOREIGN KEY (milestone_id) REFERENCES milestones(id) ON DELETE CASCADE,
    FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_milestone_tags_tag ON milestone_tags(tag_id);

-- ====================
-- Sync Support
-- ====================

-- Durable delete intents, replayed against the remote store until the
-- remote delete succeeds.
CREATE TABLE IF NOT EXISTS tombstones (
    id TEXT PRIMARY KEY,
    target_id TEXT NOT NULL,
    table_name TEXT NOT NULL,
    deleted_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_tombstones_table ON tombstones(table_name);

-- ====================
-- Derived Counters (single-row tables)
-- ====================

CREATE TABLE IF NOT EXISTS progress (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    exp INTEGER NOT NULL DEFAULT 0,
    level INTEGER NOT NULL DEFAULT 1,
    achievements TEXT NOT NULL DEFAULT '[]'
);

CREATE TABLE IF NOT EXISTS streak (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    count INTEGER NOT NULL DEFAULT 0,
    last_active_date TEXT
);
";

/// Apply the schema to a connection, recording the version.
///
/// Idempotent: every statement is `IF NOT EXISTS`.
///
/// # Errors
///
/// Returns an error if any DDL statement fails.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
        rusqlite::params![
            CURRENT_SCHEMA_VERSION.to_string(),
            chrono::Utc::now().timestamp_millis()
        ],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_applies_twice() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        apply_schema(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
