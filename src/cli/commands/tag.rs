//! Tag command implementations.

use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::commands::open_existing;
use crate::cli::TagCommands;
use crate::error::{Error, Result};
use crate::model::{Tag, TextColor};
use crate::storage::IdTable;
use crate::validate::{non_empty_title, normalize_color_hex};

#[derive(Serialize)]
struct TagOutput {
    id: String,
    name: String,
    color_hex: String,
    text_color: String,
}

impl From<&Tag> for TagOutput {
    fn from(tag: &Tag) -> Self {
        Self {
            id: tag.id.to_string(),
            name: tag.name.clone(),
            color_hex: tag.color_hex.clone(),
            text_color: tag.text_color.to_string(),
        }
    }
}

/// Execute tag commands.
pub fn execute(command: &TagCommands, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    match command {
        TagCommands::Add { name, color, text } => add(name, color, text, db_path, json),
        TagCommands::List => list(db_path, json),
        TagCommands::Rm { id } => rm(id, db_path, json),
    }
}

fn add(
    name: &str,
    color: &str,
    text: &str,
    db_path: Option<&PathBuf>,
    json: bool,
) -> Result<()> {
    let mut storage = open_existing(db_path)?;

    let name = non_empty_title(name)?;
    let color_hex = normalize_color_hex(color)?;
    let text_color: TextColor = text
        .parse()
        .map_err(|e: String| Error::InvalidArgument(e))?;

    let mut tag = Tag::new(name, color_hex);
    tag.text_color = text_color;
    storage.save_tag(&tag)?;

    if crate::is_silent() {
        println!("{}", tag.id);
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string(&TagOutput::from(&tag))?);
    } else {
        println!("Created tag {} {}", swatch(&tag.color_hex), tag.name.bold());
    }
    Ok(())
}

fn list(db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = open_existing(db_path)?;
    let tags = storage.list_tags()?;

    if json {
        let items: Vec<TagOutput> = tags.iter().map(TagOutput::from).collect();
        println!("{}", serde_json::to_string(&items)?);
    } else if tags.is_empty() {
        println!("No tags yet. Create one: stride tag add \"Work\" --color '#FF8800'");
    } else {
        for tag in &tags {
            println!(
                "{} {}  {}  {}",
                swatch(&tag.color_hex),
                short_id(tag.id),
                tag.name.bold(),
                tag.color_hex.dimmed()
            );
        }
    }
    Ok(())
}

fn rm(id: &str, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let mut storage = open_existing(db_path)?;
    let tag_id = storage
        .resolve_id(IdTable::Tags, id)?
        .ok_or_else(|| Error::TagNotFound { id: id.to_string() })?;

    storage.delete_tag(tag_id)?;

    if json {
        println!("{}", serde_json::json!({ "id": tag_id, "deleted": true }));
    } else {
        println!("Deleted tag {}", short_id(tag_id));
    }
    Ok(())
}

/// Colored swatch block for a `#RRGGBB` color.
///
/// Pulled rows are stored verbatim, so a color from another client may
/// not be normalized; anything unrenderable falls back to plain.
fn swatch(color_hex: &str) -> colored::ColoredString {
    let digits = color_hex.trim_start_matches('#');
    if digits.len() != 6 || !digits.is_ascii() {
        return "■".normal();
    }
    let channel = |i| u8::from_str_radix(&digits[i..i + 2], 16).unwrap_or(0x88);
    "■".truecolor(channel(0), channel(2), channel(4))
}

/// First id segment, enough to address entities interactively.
pub(crate) fn short_id(id: uuid::Uuid) -> String {
    id.to_string()[..8].to_string()
}
