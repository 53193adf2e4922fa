//! Offline-first synchronization engine.
//!
//! This module reconciles the local SQLite store with the remote
//! backing store:
//!
//! - **Engine**: ordered entity passes (tags → tasks → milestones) with
//!   a single-flight guard and a polled status surface
//! - **Tombstones**: durable delete intents, replayed at-least-once
//! - **Merge**: ratchet rules for gamification counters and the streak
//! - **Hashing**: SHA256 content hashing so no-op pulls skip writes
//!
//! # Conflict model
//!
//! There is no version vector. Push upserts every local record; pull
//! overwrites scalar fields remote-wins. Link sets are replaced
//! wholesale on push, never diffed. Milestone items are the exception:
//! the pull runs a three-way diff because the remote item set is
//! authoritative once the same run's push has uploaded the local set.
//!
//! # Example
//!
//! ```ignore
//! use stride::sync::SyncEngine;
//!
//! let engine = SyncEngine::new(storage, remote, user_id);
//! match engine.run().await? {
//!     SyncOutcome::Completed(summary) => println!("{} pushed", summary.total_pushed()),
//!     SyncOutcome::AlreadyRunning => println!("a run is already in flight"),
//! }
//! ```

mod engine;
mod hash;
mod merge;
mod tombstone;
mod types;

pub use engine::SyncEngine;
pub use hash::{content_hash, same_content};
pub use merge::{merge_counters, merge_streak};
pub use tombstone::TombstoneTracker;
pub use types::{
    ItemStats, PassStats, SyncError, SyncOutcome, SyncResult, SyncStatus, SyncSummary,
};
