//! Task command implementations.

use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::commands::progress::{announce_unlocks, record_completion};
use crate::cli::commands::tag::short_id;
use crate::cli::commands::{open_existing, parse_due};
use crate::cli::TaskCommands;
use crate::error::{Error, Result};
use crate::model::progress::TASK_EXP;
use crate::model::{now_ms, RecurrenceRule, SimpleTask, Tag};
use crate::storage::{IdTable, OrderedTable, SqliteStorage};
use crate::validate::non_empty_title;
use uuid::Uuid;

#[derive(Serialize)]
struct TaskOutput {
    id: String,
    title: String,
    is_done: bool,
    is_starred: bool,
    due_date: Option<i64>,
    recurrence: Option<String>,
    tags: Vec<String>,
}

fn task_output(task: &SimpleTask, tags: &[Tag]) -> TaskOutput {
    let names = task
        .tag_ids
        .iter()
        .filter_map(|id| tags.iter().find(|t| t.id == *id))
        .map(|t| t.name.clone())
        .collect();
    TaskOutput {
        id: task.id.to_string(),
        title: task.title.clone(),
        is_done: task.is_done,
        is_starred: task.is_starred,
        due_date: task.due_date,
        recurrence: task.recurrence.map(|r| r.to_string()),
        tags: names,
    }
}

/// Execute task commands.
pub fn execute(command: &TaskCommands, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    match command {
        TaskCommands::Add {
            title,
            notes,
            due,
            remind,
            star,
            every,
            tags,
        } => add(
            title,
            notes.as_deref(),
            due.as_deref(),
            *remind,
            *star,
            every.as_deref(),
            tags,
            db_path,
            json,
        ),
        TaskCommands::List { all } => list(*all, db_path, json),
        TaskCommands::Done { id } => done(id, db_path, json),
        TaskCommands::Star { id } => star(id, db_path, json),
        TaskCommands::Rm { id } => rm(id, db_path, json),
    }
}

/// Resolve tag names to ids, rejecting unknown names.
pub(crate) fn resolve_tag_names(storage: &SqliteStorage, names: &[String]) -> Result<Vec<Uuid>> {
    let known = storage.list_tags()?;
    let mut ids = Vec::with_capacity(names.len());
    for name in names {
        let tag = known
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::TagNotFound { id: name.clone() })?;
        if !ids.contains(&tag.id) {
            ids.push(tag.id);
        }
    }
    Ok(ids)
}

#[allow(clippy::too_many_arguments)]
fn add(
    title: &str,
    notes: Option<&str>,
    due: Option<&str>,
    remind: bool,
    star: bool,
    every: Option<&str>,
    tags: &[String],
    db_path: Option<&PathBuf>,
    json: bool,
) -> Result<()> {
    let mut storage = open_existing(db_path)?;

    let mut task = SimpleTask::new(non_empty_title(title)?);
    task.notes = notes.map(ToString::to_string);
    task.due_date = due.map(parse_due).transpose()?;
    task.remind = remind;
    task.is_starred = star;
    task.recurrence = every
        .map(str::parse::<RecurrenceRule>)
        .transpose()
        .map_err(Error::InvalidRecurrence)?;
    task.order = storage.next_order(OrderedTable::Tasks)?;
    task.tag_ids = resolve_tag_names(&storage, tags)?;
    storage.save_task(&task)?;

    if crate::is_silent() {
        println!("{}", task.id);
        return Ok(());
    }

    if json {
        let all_tags = storage.list_tags()?;
        println!("{}", serde_json::to_string(&task_output(&task, &all_tags))?);
    } else {
        println!("Added task {} {}", short_id(task.id), task.title.bold());
    }
    Ok(())
}

fn list(all: bool, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = open_existing(db_path)?;
    let tags = storage.list_tags()?;
    let tasks: Vec<SimpleTask> = storage
        .list_tasks()?
        .into_iter()
        .filter(|t| all || !t.is_done)
        .collect();

    if json {
        let items: Vec<TaskOutput> = tasks.iter().map(|t| task_output(t, &tags)).collect();
        println!("{}", serde_json::to_string(&items)?);
        return Ok(());
    }

    if tasks.is_empty() {
        println!("Nothing to do. Add a task: stride task add \"Water plants\"");
        return Ok(());
    }

    for task in &tasks {
        let check = if task.is_done { "[x]" } else { "[ ]" };
        let star = if task.is_starred { "★ " } else { "" };
        let mut line = format!(
            "{check} {} {}{}",
            short_id(task.id).dimmed(),
            star.yellow(),
            task.title
        );
        if let Some(due) = task.due_date {
            line.push_str(&format!("  {}", format_due(due).cyan()));
        }
        if let Some(rule) = task.recurrence {
            line.push_str(&format!("  {}", format!("({rule})").dimmed()));
        }
        let names: Vec<&str> = task
            .tag_ids
            .iter()
            .filter_map(|id| tags.iter().find(|t| t.id == *id))
            .map(|t| t.name.as_str())
            .collect();
        if !names.is_empty() {
            line.push_str(&format!("  {}", format!("#{}", names.join(" #")).dimmed()));
        }
        println!("{line}");
    }
    Ok(())
}

fn done(id: &str, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let mut storage = open_existing(db_path)?;
    let task_id = resolve_task(&storage, id)?;
    let mut task = storage
        .get_task(task_id)?
        .ok_or_else(|| Error::TaskNotFound { id: id.to_string() })?;

    let recurred = task.complete(now_ms());
    storage.save_task(&task)?;

    let (_, streak, unlocked) = record_completion(&mut storage, TASK_EXP)?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "id": task.id,
                "recurred": recurred,
                "exp_awarded": TASK_EXP,
                "streak": streak.count,
                "unlocked": unlocked,
            })
        );
        return Ok(());
    }

    if recurred {
        let next = task.due_date.map_or_else(String::new, format_due);
        println!("Done. {} rolls forward to {}", task.title.bold(), next.cyan());
    } else {
        println!("Done: {} (+{TASK_EXP} exp)", task.title.bold());
    }
    announce_unlocks(&unlocked);
    Ok(())
}

fn star(id: &str, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let mut storage = open_existing(db_path)?;
    let task_id = resolve_task(&storage, id)?;
    let mut task = storage
        .get_task(task_id)?
        .ok_or_else(|| Error::TaskNotFound { id: id.to_string() })?;

    task.is_starred = !task.is_starred;
    task.updated_at = now_ms();
    storage.save_task(&task)?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "id": task.id, "is_starred": task.is_starred })
        );
    } else if task.is_starred {
        println!("Starred {}", task.title.bold());
    } else {
        println!("Unstarred {}", task.title.bold());
    }
    Ok(())
}

fn rm(id: &str, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let mut storage = open_existing(db_path)?;
    let task_id = resolve_task(&storage, id)?;
    storage.delete_task(task_id)?;

    if json {
        println!("{}", serde_json::json!({ "id": task_id, "deleted": true }));
    } else {
        println!("Deleted task {}", short_id(task_id));
    }
    Ok(())
}

fn resolve_task(storage: &SqliteStorage, id: &str) -> Result<Uuid> {
    storage
        .resolve_id(IdTable::Tasks, id)?
        .ok_or_else(|| Error::TaskNotFound { id: id.to_string() })
}

fn format_due(due_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(due_ms)
        .map_or_else(|| due_ms.to_string(), |dt| dt.format("%Y-%m-%d").to_string())
}
