//! Command implementations.

pub mod completions;
pub mod init;
pub mod milestone;
pub mod progress;
pub mod sync;
pub mod tag;
pub mod task;
pub mod version;

use std::path::PathBuf;

use crate::config::resolve_db_path;
use crate::error::{Error, Result};
use crate::storage::SqliteStorage;

/// Open the database, requiring `stride init` to have run.
pub(crate) fn open_existing(db_path: Option<&PathBuf>) -> Result<SqliteStorage> {
    let db_path = resolve_db_path(db_path.map(PathBuf::as_path)).ok_or(Error::NotInitialized)?;
    if !db_path.exists() {
        return Err(Error::NotInitialized);
    }
    SqliteStorage::open(&db_path)
}

/// Parse a due date as `YYYY-MM-DD` (midnight UTC) or RFC3339.
pub(crate) fn parse_due(input: &str) -> Result<i64> {
    if let Ok(date) = input.parse::<chrono::NaiveDate>() {
        let midnight = date.and_hms_opt(0, 0, 0).expect("midnight is always valid");
        return Ok(midnight.and_utc().timestamp_millis());
    }
    chrono::DateTime::parse_from_rfc3339(input)
        .map(|dt| dt.timestamp_millis())
        .map_err(|_| {
            Error::InvalidArgument(format!(
                "cannot parse due date '{input}' (use YYYY-MM-DD or RFC3339)"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_due_date_forms() {
        assert_eq!(parse_due("1970-01-02").unwrap(), 86_400_000);
        assert_eq!(parse_due("1970-01-01T00:00:01Z").unwrap(), 1_000);
        assert!(parse_due("next tuesday").is_err());
    }
}
