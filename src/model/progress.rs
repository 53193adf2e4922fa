//! Gamification counters and the daily streak.
//!
//! Both states are process-wide singletons in the local store. Across
//! devices they are reconciled with ratchet rules (see `sync::merge`):
//! exp, level and streak count never regress, achievements only grow.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Exp granted for completing a simple task.
pub const TASK_EXP: i64 = 10;
/// Exp granted for completing a milestone.
pub const MILESTONE_EXP: i64 = 25;
/// Exp per level.
const EXP_PER_LEVEL: i64 = 100;

/// Well-known achievement ids.
///
/// Ids are stable wire strings; renaming one would fork the
/// achievement across devices.
pub mod achievements {
    pub const FIRST_TASK: &str = "first_task";
    pub const TASKS_10: &str = "tasks_10";
    pub const TASKS_50: &str = "tasks_50";
    pub const FIRST_MILESTONE: &str = "first_milestone";
    pub const STREAK_3: &str = "streak_3";
    pub const STREAK_7: &str = "streak_7";
}

/// Experience, level and unlocked achievements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamificationState {
    pub exp: i64,
    pub level: i64,
    pub achievements: BTreeSet<String>,
}

impl Default for GamificationState {
    fn default() -> Self {
        Self {
            exp: 0,
            level: 1,
            achievements: BTreeSet::new(),
        }
    }
}

impl GamificationState {
    /// Grant exp and raise the level if a threshold was crossed.
    ///
    /// The level never goes down, even if it was merged in from a
    /// device with a different curve.
    pub fn award(&mut self, points: i64) {
        self.exp += points;
        self.level = self.level.max(self.exp / EXP_PER_LEVEL + 1);
    }

    /// Unlock threshold achievements from lifetime completion counts.
    ///
    /// Returns the ids that are newly unlocked, for user-facing output.
    pub fn unlock_for_counts(
        &mut self,
        tasks_done: i64,
        milestones_done: i64,
        streak: i64,
    ) -> Vec<&'static str> {
        let mut unlocked = Vec::new();
        let mut check = |earned: bool, id: &'static str, set: &mut BTreeSet<String>| {
            if earned && set.insert(id.to_string()) {
                unlocked.push(id);
            }
        };

        check(tasks_done >= 1, achievements::FIRST_TASK, &mut self.achievements);
        check(tasks_done >= 10, achievements::TASKS_10, &mut self.achievements);
        check(tasks_done >= 50, achievements::TASKS_50, &mut self.achievements);
        check(
            milestones_done >= 1,
            achievements::FIRST_MILESTONE,
            &mut self.achievements,
        );
        check(streak >= 3, achievements::STREAK_3, &mut self.achievements);
        check(streak >= 7, achievements::STREAK_7, &mut self.achievements);

        unlocked
    }
}

/// Consecutive-day activity streak.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakState {
    pub count: i64,
    pub last_active_date: Option<NaiveDate>,
}

impl StreakState {
    /// Record activity on `today`.
    ///
    /// Same-day activity is a no-op, consecutive days extend the
    /// streak, and a gap restarts it at 1.
    pub fn record_activity(&mut self, today: NaiveDate) {
        match self.last_active_date {
            Some(last) if last == today => return,
            Some(last) if last.succ_opt() == Some(today) => self.count += 1,
            _ => self.count = 1,
        }
        self.last_active_date = Some(today);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_award_levels_up_every_hundred_exp() {
        let mut state = GamificationState::default();
        state.award(95);
        assert_eq!(state.level, 1);
        state.award(10);
        assert_eq!(state.exp, 105);
        assert_eq!(state.level, 2);
    }

    #[test]
    fn test_award_never_lowers_a_merged_level() {
        let mut state = GamificationState {
            exp: 10,
            level: 5,
            achievements: BTreeSet::new(),
        };
        state.award(TASK_EXP);
        assert_eq!(state.level, 5);
    }

    #[test]
    fn test_unlock_reports_only_new_achievements() {
        let mut state = GamificationState::default();
        let unlocked = state.unlock_for_counts(1, 0, 0);
        assert_eq!(unlocked, vec![achievements::FIRST_TASK]);

        // Already earned: not reported again.
        let unlocked = state.unlock_for_counts(3, 1, 3);
        assert_eq!(
            unlocked,
            vec![achievements::FIRST_MILESTONE, achievements::STREAK_3]
        );
    }

    #[test]
    fn test_streak_extends_and_resets() {
        let mut streak = StreakState::default();
        streak.record_activity(date(2025, 6, 1));
        assert_eq!(streak.count, 1);

        // Same day: unchanged.
        streak.record_activity(date(2025, 6, 1));
        assert_eq!(streak.count, 1);

        // Next day: extends.
        streak.record_activity(date(2025, 6, 2));
        assert_eq!(streak.count, 2);

        // Gap: restarts.
        streak.record_activity(date(2025, 6, 10));
        assert_eq!(streak.count, 1);
        assert_eq!(streak.last_active_date, Some(date(2025, 6, 10)));
    }
}
