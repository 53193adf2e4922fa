//! Sync command implementations.

use colored::Colorize;
use std::path::PathBuf;

use crate::cli::commands::open_existing;
use crate::cli::SyncCommands;
use crate::config::RemoteConfig;
use crate::error::{Error, Result};
use crate::model::RemoteTable;
use crate::remote::HttpRemote;
use crate::sync::{PassStats, SyncEngine, SyncOutcome};

/// Execute sync commands.
pub fn execute(command: &SyncCommands, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    match command {
        SyncCommands::Run => run(db_path, json),
        SyncCommands::Status => status(db_path, json),
    }
}

fn run(db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = open_existing(db_path)?;
    let RemoteConfig {
        url,
        api_key,
        token,
        user_id,
    } = RemoteConfig::from_env()?;

    let remote = HttpRemote::new(url, api_key, token);
    let engine = SyncEngine::new(storage, remote, user_id);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| Error::Other(format!("failed to create async runtime: {e}")))?;
    let outcome = rt.block_on(engine.run())?;

    match outcome {
        SyncOutcome::AlreadyRunning => {
            // Unreachable from the CLI (one engine per process), but the
            // contract says callers must handle it.
            if json {
                println!("{}", serde_json::to_string(&outcome)?);
            } else {
                println!("A sync run is already in flight; nothing to do.");
            }
        }
        SyncOutcome::Completed(ref summary) => {
            if json {
                println!("{}", serde_json::to_string(&outcome)?);
            } else {
                println!("Sync complete.");
                println!();
                print_pass("Tags", &summary.tags);
                print_pass("Tasks", &summary.tasks);
                print_pass("Milestones", &summary.milestones);
                let items = &summary.items;
                if items.created + items.updated + items.removed > 0 {
                    println!(
                        "  Items:      {} added, {} updated, {} removed",
                        items.created, items.updated, items.removed
                    );
                }
                if summary.total_local_write_failures() > 0 {
                    println!(
                        "  {} {} local write(s) dropped, see log",
                        "warning:".yellow(),
                        summary.total_local_write_failures()
                    );
                }
            }
        }
    }
    Ok(())
}

fn print_pass(name: &str, stats: &PassStats) {
    println!(
        "  {:<11} {} pushed, {} pulled ({} new), {} deletes replayed",
        format!("{name}:"),
        stats.pushed,
        stats.pulled(),
        stats.created,
        stats.deletes_replayed
    );
    if stats.deletes_retained > 0 {
        println!(
            "  {:<11} {} delete(s) retained for next run",
            "", stats.deletes_retained
        );
    }
}

fn status(db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = open_existing(db_path)?;

    let tags = storage.list_tags()?.len();
    let tasks = storage.list_tasks()?.len();
    let milestones = storage.list_milestones()?.len();
    let tombstones = storage.pending_tombstones(None)?;
    let remote_configured = RemoteConfig::from_env().is_ok();

    if json {
        let pending: Vec<serde_json::Value> = tombstones
            .iter()
            .map(|t| {
                serde_json::json!({
                    "table": t.table.as_str(),
                    "target_id": t.target_id,
                    "deleted_at": t.deleted_at,
                })
            })
            .collect();
        let output = serde_json::json!({
            "tags": tags,
            "tasks": tasks,
            "milestones": milestones,
            "pending_deletes": pending,
            "remote_configured": remote_configured,
        });
        println!("{output}");
        return Ok(());
    }

    println!("Local store:");
    println!("  Tags:       {tags}");
    println!("  Tasks:      {tasks}");
    println!("  Milestones: {milestones}");
    println!();

    if tombstones.is_empty() {
        println!("No pending deletes.");
    } else {
        println!("Pending deletes (replayed on next run):");
        for table in [
            RemoteTable::Tags,
            RemoteTable::Checklists,
            RemoteTable::Milestones,
            RemoteTable::MilestoneItems,
        ] {
            let count = tombstones.iter().filter(|t| t.table == table).count();
            if count > 0 {
                println!("  {:<18} {count}", table.as_str());
            }
        }
    }
    println!();

    if remote_configured {
        println!("Remote: configured");
    } else {
        println!(
            "Remote: {} (set STRIDE_SYNC_URL, STRIDE_SYNC_KEY, STRIDE_SYNC_TOKEN, STRIDE_USER_ID)",
            "not configured".yellow()
        );
    }
    Ok(())
}
