//! Sync types: error taxonomy, run summaries, and the status surface.

use serde::Serialize;

/// Sync-specific errors.
///
/// The taxonomy drives retry policy: [`SyncError::Network`] heals on
/// the next triggered run; auth and decode failures need the caller.
/// Local persistence failures inside a pull are best-effort (counted in
/// the summary, never fatal); this variant covers the reads and
/// transactions sync itself cannot continue without.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Transient transport failure; the next scheduled run retries.
    #[error("Network error: {0}")]
    Network(String),

    /// Malformed remote payload; aborts the current pass.
    #[error("Decode error in {table}: {message}")]
    Decode { table: String, message: String },

    /// The remote store rejected our credentials; aborts the run.
    #[error("Auth error: {0}")]
    Auth(String),

    /// The local store failed a read or transaction sync depends on.
    #[error("Local store error: {0}")]
    LocalStore(String),
}

impl SyncError {
    /// Whether the next scheduled run is expected to succeed unchanged.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<crate::error::Error> for SyncError {
    fn from(err: crate::error::Error) -> Self {
        Self::LocalStore(err.to_string())
    }
}

/// Result type for sync operations.
pub type SyncResult<T> = std::result::Result<T, SyncError>;

/// Outcome of a [`crate::sync::SyncEngine::run`] invocation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// The run executed to completion.
    Completed(SyncSummary),
    /// Another run was already in flight; nothing was done and nothing
    /// is queued.
    AlreadyRunning,
}

/// Statistics for one entity pass.
#[derive(Debug, Default, Clone, Serialize)]
pub struct PassStats {
    /// Local records upserted to the remote table.
    pub pushed: usize,
    /// Remote link sets replaced wholesale.
    pub links_replaced: usize,
    /// Pulled rows inserted as new local records.
    pub created: usize,
    /// Pulled rows that overwrote an existing local record.
    pub updated: usize,
    /// Pulled rows identical to the local record (no write issued).
    pub unchanged: usize,
    /// Tombstones whose remote delete succeeded and were cleared.
    pub deletes_replayed: usize,
    /// Tombstones retained for the next run after a failed delete.
    pub deletes_retained: usize,
    /// Local writes dropped by the best-effort pull policy.
    pub local_write_failures: usize,
}

impl PassStats {
    /// Total pulled rows processed.
    #[must_use]
    pub fn pulled(&self) -> usize {
        self.created + self.updated + self.unchanged
    }
}

/// Milestone item reconciliation counts (three-way diff in the pull).
#[derive(Debug, Default, Clone, Serialize)]
pub struct ItemStats {
    /// Remote items inserted locally.
    pub created: usize,
    /// Remote items that overwrote a local item.
    pub updated: usize,
    /// Local items removed because they were absent remotely.
    pub removed: usize,
}

/// Statistics for a full sync run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct SyncSummary {
    pub tags: PassStats,
    pub tasks: PassStats,
    pub milestones: PassStats,
    pub items: ItemStats,
}

impl SyncSummary {
    /// Total records pushed across all passes.
    #[must_use]
    pub fn total_pushed(&self) -> usize {
        self.tags.pushed + self.tasks.pushed + self.milestones.pushed
    }

    /// Total pulled rows processed across all passes.
    #[must_use]
    pub fn total_pulled(&self) -> usize {
        self.tags.pulled() + self.tasks.pulled() + self.milestones.pulled()
    }

    /// Total local writes dropped by the best-effort policy.
    #[must_use]
    pub fn total_local_write_failures(&self) -> usize {
        self.tags.local_write_failures
            + self.tasks.local_write_failures
            + self.milestones.local_write_failures
    }
}

/// Snapshot of the engine's observable state, polled by consumers.
#[derive(Debug, Clone, Serialize)]
pub struct SyncStatus {
    pub is_running: bool,
    /// Unix millis of the last run that completed without error.
    pub last_success_at: Option<i64>,
    /// Message of the last failed run, cleared by the next success.
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(SyncError::Network("reset".into()).is_transient());
        assert!(!SyncError::Auth("expired".into()).is_transient());
        assert!(
            !SyncError::Decode {
                table: "tags".into(),
                message: "bad uuid".into()
            }
            .is_transient()
        );
    }

    #[test]
    fn test_summary_totals() {
        let mut summary = SyncSummary::default();
        summary.tags.pushed = 2;
        summary.tasks.pushed = 3;
        summary.tasks.created = 1;
        summary.tasks.unchanged = 4;
        summary.milestones.updated = 2;

        assert_eq!(summary.total_pushed(), 5);
        assert_eq!(summary.total_pulled(), 7);
        assert_eq!(summary.total_local_write_failures(), 0);
    }
}
