//! Data models for Stride.
//!
//! This module contains all domain models:
//! - Tag
//! - SimpleTask
//! - Milestone / MilestoneItem
//! - Tombstone
//! - GamificationState / StreakState
//! - RecurrenceRule

pub mod milestone;
pub mod progress;
pub mod recurrence;
pub mod tag;
pub mod task;
pub mod tombstone;

pub use milestone::{Milestone, MilestoneItem};
pub use progress::{achievements, GamificationState, StreakState};
pub use recurrence::RecurrenceRule;
pub use tag::{Tag, TextColor};
pub use task::SimpleTask;
pub use tombstone::{RemoteTable, Tombstone};

/// Current wall-clock time as Unix milliseconds.
///
/// All local timestamps are stored in this form; wire types convert to
/// RFC3339 at the DTO boundary.
#[must_use]
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
