//! CLI definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

/// Stride CLI - offline-first checklists and milestones that sync
#[derive(Parser, Debug)]
#[command(name = "stride", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (default: ~/.stride/data/stride.db)
    #[arg(long, global = true, env = "STRIDE_DB")]
    pub db: Option<PathBuf>,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Output only the ID (for scripting)
    #[arg(long, global = true)]
    pub silent: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the Stride database
    Init {
        /// Overwrite an existing database
        #[arg(long)]
        force: bool,
    },

    /// Print version information
    Version,

    /// Tag management
    Tag {
        #[command(subcommand)]
        command: TagCommands,
    },

    /// Task management
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },

    /// Milestone management
    Milestone {
        #[command(subcommand)]
        command: MilestoneCommands,
    },

    /// Show level, exp, achievements and streak
    Progress,

    /// Sync with the remote store
    Sync {
        #[command(subcommand)]
        command: SyncCommands,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum TagCommands {
    /// Create a tag
    Add {
        /// Tag name
        name: String,

        /// Hex color, e.g. #FF8800
        #[arg(long, default_value = "#8899AA")]
        color: String,

        /// Text color preference (auto, light, dark)
        #[arg(long, default_value = "auto")]
        text: String,
    },

    /// List tags
    List,

    /// Delete a tag (full id or unique prefix)
    Rm { id: String },
}

#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a task
    Add {
        /// Task title
        title: String,

        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,

        /// Due date (YYYY-MM-DD or RFC3339)
        #[arg(long)]
        due: Option<String>,

        /// Enable a reminder at the due date
        #[arg(long)]
        remind: bool,

        /// Star the task
        #[arg(long)]
        star: bool,

        /// Recurrence rule (daily, weekly, monthly, yearly)
        #[arg(long)]
        every: Option<String>,

        /// Attach tags by name (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// List tasks
    List {
        /// Include completed tasks
        #[arg(long)]
        all: bool,
    },

    /// Complete a task (recurring tasks roll forward)
    Done { id: String },

    /// Toggle the star on a task
    Star { id: String },

    /// Delete a task (full id or unique prefix)
    Rm { id: String },
}

#[derive(Subcommand, Debug)]
pub enum MilestoneCommands {
    /// Create a milestone
    Add {
        /// Milestone title
        title: String,

        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,

        /// Due date (YYYY-MM-DD or RFC3339)
        #[arg(long)]
        due: Option<String>,

        /// Attach tags by name (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// List milestones with item progress
    List,

    /// Milestone item management
    Item {
        #[command(subcommand)]
        command: ItemCommands,
    },

    /// Complete a milestone
    Done { id: String },

    /// Delete a milestone and its items
    Rm { id: String },
}

#[derive(Subcommand, Debug)]
pub enum ItemCommands {
    /// Add an item to a milestone
    Add {
        /// Milestone id (full or unique prefix)
        milestone: String,

        /// Item text
        text: String,
    },

    /// Toggle an item done/open
    Check { id: String },

    /// Delete an item
    Rm { id: String },
}

#[derive(Subcommand, Debug)]
pub enum SyncCommands {
    /// Run one sync pass against the remote store
    Run,

    /// Show local sync state (pending deletes, counts, remote config)
    Status,
}
