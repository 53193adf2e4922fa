//! User-input validation and normalization.

use crate::error::{Error, Result};

/// Normalize a hex color to canonical `#RRGGBB` form.
///
/// Accepts an optional leading `#` and lowercase digits.
///
/// # Errors
///
/// Returns `Error::InvalidColor` for anything that is not six hex digits.
pub fn normalize_color_hex(input: &str) -> Result<String> {
    let digits = input.strip_prefix('#').unwrap_or(input);
    if digits.len() == 6 && digits.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(format!("#{}", digits.to_ascii_uppercase()))
    } else {
        Err(Error::InvalidColor(input.to_string()))
    }
}

/// Validate a non-empty, trimmed title.
///
/// # Errors
///
/// Returns `Error::InvalidArgument` for empty or whitespace-only titles.
pub fn non_empty_title(input: &str) -> Result<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        Err(Error::InvalidArgument("title must not be empty".to_string()))
    } else {
        Ok(trimmed.to_string())
    }
}
