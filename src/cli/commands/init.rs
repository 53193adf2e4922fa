//! Init command implementation.

use std::path::PathBuf;

use crate::config::resolve_db_path;
use crate::error::{Error, Result};
use crate::storage::SqliteStorage;

/// Execute the init command.
///
/// # Errors
///
/// Returns `AlreadyInitialized` if the database exists and `force` is
/// not set.
pub fn execute(force: bool, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let db_path = resolve_db_path(db_path.map(PathBuf::as_path))
        .ok_or_else(|| Error::Config("cannot determine a database location".to_string()))?;

    if db_path.exists() {
        if !force {
            return Err(Error::AlreadyInitialized { path: db_path });
        }
        std::fs::remove_file(&db_path)?;
    }

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    SqliteStorage::open(&db_path)?;

    if json {
        let output = serde_json::json!({
            "initialized": true,
            "db": db_path.display().to_string(),
        });
        println!("{output}");
    } else {
        println!("Initialized Stride database at {}", db_path.display());
    }

    Ok(())
}
