//! Ratchet merges for gamification counters and the streak.
//!
//! These functions are pure, deterministic, commutative and idempotent.
//! They are invoked from several call sites with no ordering guarantee
//! (initial session restore, post-auth account merge, background sync),
//! so any weaker algebra would let devices disagree forever.

use crate::model::{GamificationState, StreakState};

/// Merge two gamification states.
///
/// Exp and level ratchet to the maximum of either side; achievements
/// are the set union. Nothing ever regresses.
#[must_use]
pub fn merge_counters(local: &GamificationState, remote: &GamificationState) -> GamificationState {
    GamificationState {
        exp: local.exp.max(remote.exp),
        level: local.level.max(remote.level),
        achievements: local
            .achievements
            .union(&remote.achievements)
            .cloned()
            .collect(),
    }
}

/// Merge two streak states.
///
/// The larger count wins and brings its own `last_active_date`. On a
/// count tie the later date is taken, which keeps the merge
/// commutative.
#[must_use]
pub fn merge_streak(local: &StreakState, remote: &StreakState) -> StreakState {
    match local.count.cmp(&remote.count) {
        std::cmp::Ordering::Greater => local.clone(),
        std::cmp::Ordering::Less => remote.clone(),
        std::cmp::Ordering::Equal => StreakState {
            count: local.count,
            last_active_date: local.last_active_date.max(remote.last_active_date),
        },
    }
}
