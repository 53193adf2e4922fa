//! Progress command and completion awards.

use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::commands::open_existing;
use crate::error::Result;
use crate::model::{GamificationState, StreakState};
use crate::storage::SqliteStorage;

#[derive(Serialize)]
struct ProgressOutput {
    exp: i64,
    level: i64,
    achievements: Vec<String>,
    streak: i64,
    last_active_date: Option<String>,
}

/// Apply the rewards of completing something: exp, streak, achievements.
///
/// Returns the updated states and any newly unlocked achievement ids.
///
/// # Errors
///
/// Returns an error if the counters cannot be read or written.
pub(crate) fn record_completion(
    storage: &mut SqliteStorage,
    points: i64,
) -> Result<(GamificationState, StreakState, Vec<&'static str>)> {
    let mut counters = storage.gamification()?;
    let mut streak = storage.streak()?;

    counters.award(points);
    streak.record_activity(chrono::Utc::now().date_naive());
    let unlocked = counters.unlock_for_counts(
        storage.completed_task_count()?,
        storage.completed_milestone_count()?,
        streak.count,
    );

    storage.set_gamification(&counters)?;
    storage.set_streak(&streak)?;

    Ok((counters, streak, unlocked))
}

/// Print newly unlocked achievements after a completion.
pub(crate) fn announce_unlocks(unlocked: &[&str]) {
    for id in unlocked {
        println!("{} unlocked: {}", "★".yellow(), id.bold());
    }
}

/// Execute the progress command.
///
/// # Errors
///
/// Returns an error if the counters cannot be read.
pub fn execute(db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = open_existing(db_path)?;
    let counters = storage.gamification()?;
    let streak = storage.streak()?;

    if json {
        let output = ProgressOutput {
            exp: counters.exp,
            level: counters.level,
            achievements: counters.achievements.iter().cloned().collect(),
            streak: streak.count,
            last_active_date: streak.last_active_date.map(|d| d.to_string()),
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("Level {}  ({} exp)", counters.level.to_string().bold(), counters.exp);
    if streak.count > 0 {
        println!("Streak: {} day(s)", streak.count.to_string().bold());
    } else {
        println!("Streak: none yet");
    }

    if counters.achievements.is_empty() {
        println!("No achievements yet. Complete a task to earn the first one.");
    } else {
        println!("Achievements:");
        for id in &counters.achievements {
            println!("  {} {}", "★".yellow(), id);
        }
    }
    Ok(())
}
