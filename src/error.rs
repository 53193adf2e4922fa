//! Error types for the Stride CLI.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=db, 3=not_found, 4=validation, 5=network, ...)
//! - Retryability flags so schedulers know which failures heal on the next run
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use std::path::PathBuf;
use thiserror::Error;

use crate::sync::SyncError;

/// Result type alias for Stride operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string and a category-based
/// exit code. Scripts match on the string; shells on the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Database (exit 2)
    NotInitialized,
    AlreadyInitialized,
    DatabaseError,

    // Not Found (exit 3)
    TagNotFound,
    TaskNotFound,
    MilestoneNotFound,
    ItemNotFound,

    // Validation (exit 4)
    InvalidArgument,
    InvalidColor,
    InvalidRecurrence,

    // Sync (exit 5/6)
    SyncNetwork,
    SyncDecode,
    SyncAuth,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::AlreadyInitialized => "ALREADY_INITIALIZED",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::TagNotFound => "TAG_NOT_FOUND",
            Self::TaskNotFound => "TASK_NOT_FOUND",
            Self::MilestoneNotFound => "MILESTONE_NOT_FOUND",
            Self::ItemNotFound => "ITEM_NOT_FOUND",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::InvalidColor => "INVALID_COLOR",
            Self::InvalidRecurrence => "INVALID_RECURRENCE",
            Self::SyncNetwork => "SYNC_NETWORK",
            Self::SyncDecode => "SYNC_DECODE",
            Self::SyncAuth => "SYNC_AUTH",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::NotInitialized | Self::AlreadyInitialized | Self::DatabaseError => 2,
            Self::TagNotFound
            | Self::TaskNotFound
            | Self::MilestoneNotFound
            | Self::ItemNotFound => 3,
            Self::InvalidArgument | Self::InvalidColor | Self::InvalidRecurrence => 4,
            Self::SyncNetwork | Self::SyncDecode => 5,
            Self::SyncAuth => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether the failure is expected to heal on a later retry.
    ///
    /// True for transient network failures (the next triggered sync run
    /// retries wholesale) and for validation errors a caller can correct.
    /// False for auth, decode, not-found and internal errors.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SyncNetwork
                | Self::InvalidArgument
                | Self::InvalidColor
                | Self::InvalidRecurrence
                | Self::DatabaseError
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in Stride CLI operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not initialized: run `stride init` first")]
    NotInitialized,

    #[error("Already initialized at {path}")]
    AlreadyInitialized { path: PathBuf },

    #[error("Tag not found: {id}")]
    TagNotFound { id: String },

    #[error("Task not found: {id}")]
    TaskNotFound { id: String },

    #[error("Milestone not found: {id}")]
    MilestoneNotFound { id: String },

    #[error("Milestone item not found: {id}")]
    ItemNotFound { id: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid color: {0}")]
    InvalidColor(String),

    #[error("Invalid recurrence rule: {0}")]
    InvalidRecurrence(String),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized => ErrorCode::NotInitialized,
            Self::AlreadyInitialized { .. } => ErrorCode::AlreadyInitialized,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::TagNotFound { .. } => ErrorCode::TagNotFound,
            Self::TaskNotFound { .. } => ErrorCode::TaskNotFound,
            Self::MilestoneNotFound { .. } => ErrorCode::MilestoneNotFound,
            Self::ItemNotFound { .. } => ErrorCode::ItemNotFound,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::InvalidColor(_) => ErrorCode::InvalidColor,
            Self::InvalidRecurrence(_) => ErrorCode::InvalidRecurrence,
            Self::Sync(e) => match e {
                SyncError::Network(_) => ErrorCode::SyncNetwork,
                SyncError::Decode { .. } => ErrorCode::SyncDecode,
                SyncError::Auth(_) => ErrorCode::SyncAuth,
                SyncError::LocalStore(_) => ErrorCode::DatabaseError,
            },
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint for humans and scripts.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NotInitialized => Some("Run `stride init` to create the database".to_string()),

            Self::AlreadyInitialized { path } => Some(format!(
                "Database already exists at {}. Use `--force` to reinitialize.",
                path.display()
            )),

            Self::TagNotFound { id } => Some(format!(
                "No tag with ID '{id}'. Use `stride tag list` to see available tags."
            )),

            Self::TaskNotFound { id } => Some(format!(
                "No task with ID '{id}'. Use `stride task list` to see available tasks."
            )),

            Self::MilestoneNotFound { id } => Some(format!(
                "No milestone with ID '{id}'. Use `stride milestone list` to see them."
            )),

            Self::ItemNotFound { id } => Some(format!("No milestone item with ID '{id}'.")),

            Self::InvalidColor(_) => Some("Colors are hex RGB, e.g. #FF8800 or FF8800".to_string()),

            Self::InvalidRecurrence(_) => {
                Some("Valid recurrence rules: daily, weekly, monthly, yearly".to_string())
            }

            Self::Sync(SyncError::Auth(_)) => Some(
                "The sync token was rejected. Re-authenticate and update STRIDE_SYNC_TOKEN."
                    .to_string(),
            ),

            Self::Sync(SyncError::Network(_)) => Some(
                "The remote store was unreachable. The next `stride sync run` retries the \
                 whole pass."
                    .to_string(),
            ),

            Self::Config(_) => Some(
                "Sync needs STRIDE_SYNC_URL, STRIDE_SYNC_KEY, STRIDE_SYNC_TOKEN and \
                 STRIDE_USER_ID set."
                    .to_string(),
            ),

            _ => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    ///
    /// Includes error code, message, retryability, exit code, and
    /// optional recovery hint.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}
