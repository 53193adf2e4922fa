//! Configuration management.
//!
//! This module resolves the local database path and the remote sync
//! credentials.
//!
//! # Architecture
//!
//! Stride uses a single **global database** at `~/.stride/data/stride.db`
//! so every invocation sees the same local store regardless of working
//! directory. Remote credentials come from the environment: background
//! schedulers and shell sessions share one configuration with no file
//! to go stale.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Get the global Stride directory location (`~/.stride`).
#[must_use]
pub fn global_stride_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".stride"))
}

/// Check if test mode is enabled.
///
/// Test mode is enabled by setting `STRIDE_TEST_DB=1` (or any truthy
/// value) and redirects all database operations to an isolated path.
#[must_use]
pub fn is_test_mode() -> bool {
    std::env::var("STRIDE_TEST_DB")
        .map(|v| !v.is_empty() && v != "0" && v.to_lowercase() != "false")
        .unwrap_or(false)
}

/// Get the test database path (`~/.stride/test/stride.db`).
#[must_use]
pub fn test_db_path() -> Option<PathBuf> {
    global_stride_dir().map(|dir| dir.join("test").join("stride.db"))
}

/// Resolve the database path.
///
/// Priority:
/// 1. If `explicit_path` is provided, use it directly
/// 2. `STRIDE_TEST_DB` set → isolated test database
/// 3. `STRIDE_DB` environment variable
/// 4. Global location: `~/.stride/data/stride.db`
#[must_use]
pub fn resolve_db_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    if is_test_mode() {
        return test_db_path();
    }

    if let Ok(db_path) = std::env::var("STRIDE_DB") {
        if !db_path.trim().is_empty() {
            return Some(PathBuf::from(db_path));
        }
    }

    global_stride_dir().map(|dir| dir.join("data").join("stride.db"))
}

/// Remote sync endpoint and credentials.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// API root, e.g. `https://api.stride.app`.
    pub url: String,
    /// App API key sent with every request.
    pub api_key: String,
    /// Bearer token of the authenticated user.
    pub token: String,
    /// Id of the authenticated user; every remote row is scoped to it.
    pub user_id: String,
}

impl RemoteConfig {
    /// Load the remote configuration from the environment.
    ///
    /// Reads `STRIDE_SYNC_URL`, `STRIDE_SYNC_KEY`, `STRIDE_SYNC_TOKEN`
    /// and `STRIDE_USER_ID`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming the first missing variable.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            url: require_env("STRIDE_SYNC_URL")?,
            api_key: require_env("STRIDE_SYNC_KEY")?,
            token: require_env("STRIDE_SYNC_TOKEN")?,
            user_id: require_env("STRIDE_USER_ID")?,
        })
    }
}

fn require_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Error::Config(format!("{name} is not set"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_db_path_with_explicit() {
        let explicit = PathBuf::from("/custom/path/db.sqlite");
        let result = resolve_db_path(Some(&explicit));
        assert_eq!(result, Some(explicit));
    }

    #[test]
    fn test_global_dir_exists() {
        let dir = global_stride_dir();
        assert!(dir.is_some());
        assert!(dir.unwrap().ends_with(".stride"));
    }

    #[test]
    fn test_test_db_path_is_separate() {
        let global = global_stride_dir().unwrap();
        let test = test_db_path().unwrap();
        assert!(test.to_string_lossy().contains("/test/"));
        assert_ne!(global.join("data").join("stride.db"), test);
    }
}
