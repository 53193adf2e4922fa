//! Milestone command implementations.

use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::commands::progress::{announce_unlocks, record_completion};
use crate::cli::commands::tag::short_id;
use crate::cli::commands::task::resolve_tag_names;
use crate::cli::commands::{open_existing, parse_due};
use crate::cli::{ItemCommands, MilestoneCommands};
use crate::error::{Error, Result};
use crate::model::progress::MILESTONE_EXP;
use crate::model::{now_ms, Milestone, MilestoneItem};
use crate::storage::{IdTable, OrderedTable, SqliteStorage};
use crate::validate::non_empty_title;
use uuid::Uuid;

#[derive(Serialize)]
struct MilestoneOutput {
    id: String,
    title: String,
    is_done: bool,
    due_date: Option<i64>,
    items_done: usize,
    items_total: usize,
}

impl From<&Milestone> for MilestoneOutput {
    fn from(m: &Milestone) -> Self {
        Self {
            id: m.id.to_string(),
            title: m.title.clone(),
            is_done: m.is_done,
            due_date: m.due_date,
            items_done: m.done_items(),
            items_total: m.items.len(),
        }
    }
}

/// Execute milestone commands.
pub fn execute(command: &MilestoneCommands, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    match command {
        MilestoneCommands::Add {
            title,
            notes,
            due,
            tags,
        } => add(title, notes.as_deref(), due.as_deref(), tags, db_path, json),
        MilestoneCommands::List => list(db_path, json),
        MilestoneCommands::Item { command } => item(command, db_path, json),
        MilestoneCommands::Done { id } => done(id, db_path, json),
        MilestoneCommands::Rm { id } => rm(id, db_path, json),
    }
}

fn add(
    title: &str,
    notes: Option<&str>,
    due: Option<&str>,
    tags: &[String],
    db_path: Option<&PathBuf>,
    json: bool,
) -> Result<()> {
    let mut storage = open_existing(db_path)?;

    let mut milestone = Milestone::new(non_empty_title(title)?);
    milestone.notes = notes.map(ToString::to_string);
    milestone.due_date = due.map(parse_due).transpose()?;
    milestone.order = storage.next_order(OrderedTable::Milestones)?;
    milestone.tag_ids = resolve_tag_names(&storage, tags)?;
    storage.save_milestone(&milestone)?;

    if crate::is_silent() {
        println!("{}", milestone.id);
        return Ok(());
    }

    if json {
        println!(
            "{}",
            serde_json::to_string(&MilestoneOutput::from(&milestone))?
        );
    } else {
        println!(
            "Added milestone {} {}",
            short_id(milestone.id),
            milestone.title.bold()
        );
    }
    Ok(())
}

fn list(db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = open_existing(db_path)?;
    let milestones = storage.list_milestones()?;

    if json {
        let items: Vec<MilestoneOutput> = milestones.iter().map(MilestoneOutput::from).collect();
        println!("{}", serde_json::to_string(&items)?);
        return Ok(());
    }

    if milestones.is_empty() {
        println!("No milestones yet. Add one: stride milestone add \"Ship v1\"");
        return Ok(());
    }

    for m in &milestones {
        let check = if m.is_done { "[x]" } else { "[ ]" };
        println!(
            "{check} {} {}  {}",
            short_id(m.id).dimmed(),
            m.title.bold(),
            format!("{}/{}", m.done_items(), m.items.len()).cyan()
        );
        for item in &m.items {
            let mark = if item.is_done { "x" } else { " " };
            println!("      [{mark}] {} {}", short_id(item.id).dimmed(), item.text);
        }
    }
    Ok(())
}

fn item(command: &ItemCommands, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    match command {
        ItemCommands::Add { milestone, text } => item_add(milestone, text, db_path, json),
        ItemCommands::Check { id } => item_check(id, db_path, json),
        ItemCommands::Rm { id } => item_rm(id, db_path, json),
    }
}

fn item_add(milestone: &str, text: &str, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let mut storage = open_existing(db_path)?;
    let milestone_id = resolve_milestone(&storage, milestone)?;
    let parent = storage
        .get_milestone(milestone_id)?
        .ok_or_else(|| Error::MilestoneNotFound {
            id: milestone.to_string(),
        })?;

    let position = parent.items.iter().map(|i| i.position + 1).max().unwrap_or(0);
    let item = MilestoneItem::new(milestone_id, non_empty_title(text)?, position);
    storage.save_item(&item)?;
    touch_milestone(&mut storage, milestone_id)?;

    if crate::is_silent() {
        println!("{}", item.id);
        return Ok(());
    }

    if json {
        println!(
            "{}",
            serde_json::json!({ "id": item.id, "milestone_id": milestone_id, "text": item.text })
        );
    } else {
        println!("Added item {} to {}", short_id(item.id), parent.title.bold());
    }
    Ok(())
}

fn item_check(id: &str, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let mut storage = open_existing(db_path)?;
    let item_id = storage
        .resolve_id(IdTable::MilestoneItems, id)?
        .ok_or_else(|| Error::ItemNotFound { id: id.to_string() })?;

    // Load through the parent so the toggle sees current state.
    let parent_id: Uuid = {
        let row: String = storage
            .conn()
            .query_row(
                "SELECT milestone_id FROM milestone_items WHERE id = ?1",
                rusqlite::params![item_id.to_string()],
                |r| r.get(0),
            )
            .map_err(Error::Database)?;
        row.parse()
            .map_err(|_| Error::ItemNotFound { id: id.to_string() })?
    };
    let parent = storage
        .get_milestone(parent_id)?
        .ok_or_else(|| Error::ItemNotFound { id: id.to_string() })?;
    let mut item = parent
        .items
        .iter()
        .find(|i| i.id == item_id)
        .cloned()
        .ok_or_else(|| Error::ItemNotFound { id: id.to_string() })?;

    item.is_done = !item.is_done;
    storage.save_item(&item)?;
    touch_milestone(&mut storage, parent_id)?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "id": item.id, "is_done": item.is_done })
        );
    } else {
        let state = if item.is_done { "done" } else { "open" };
        println!("Item {} is now {state}", item.text.bold());
    }
    Ok(())
}

fn item_rm(id: &str, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let mut storage = open_existing(db_path)?;
    let item_id = storage
        .resolve_id(IdTable::MilestoneItems, id)?
        .ok_or_else(|| Error::ItemNotFound { id: id.to_string() })?;

    storage.delete_item(item_id)?;

    if json {
        println!("{}", serde_json::json!({ "id": item_id, "deleted": true }));
    } else {
        println!("Deleted item {}", short_id(item_id));
    }
    Ok(())
}

fn done(id: &str, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let mut storage = open_existing(db_path)?;
    let milestone_id = resolve_milestone(&storage, id)?;
    let mut milestone = storage
        .get_milestone(milestone_id)?
        .ok_or_else(|| Error::MilestoneNotFound { id: id.to_string() })?;

    milestone.is_done = true;
    milestone.completed_at = Some(now_ms());
    milestone.updated_at = now_ms();
    storage.save_milestone(&milestone)?;

    let (_, streak, unlocked) = record_completion(&mut storage, MILESTONE_EXP)?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "id": milestone.id,
                "exp_awarded": MILESTONE_EXP,
                "streak": streak.count,
                "unlocked": unlocked,
            })
        );
        return Ok(());
    }

    println!(
        "Milestone complete: {} (+{MILESTONE_EXP} exp)",
        milestone.title.bold()
    );
    announce_unlocks(&unlocked);
    Ok(())
}

fn rm(id: &str, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let mut storage = open_existing(db_path)?;
    let milestone_id = resolve_milestone(&storage, id)?;
    storage.delete_milestone(milestone_id)?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "id": milestone_id, "deleted": true })
        );
    } else {
        println!("Deleted milestone {}", short_id(milestone_id));
    }
    Ok(())
}

fn resolve_milestone(storage: &SqliteStorage, id: &str) -> Result<Uuid> {
    storage
        .resolve_id(IdTable::Milestones, id)?
        .ok_or_else(|| Error::MilestoneNotFound { id: id.to_string() })
}

/// Stamp the parent milestone after an item mutation.
fn touch_milestone(storage: &mut SqliteStorage, id: Uuid) -> Result<()> {
    if let Some(mut m) = storage.get_milestone(id)? {
        m.updated_at = now_ms();
        storage.save_milestone(&m)?;
    }
    Ok(())
}
