//! Tag model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::now_ms;

/// Preferred text color rendered on top of the tag's background color.
///
/// Local-only presentation hint; it does not travel on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextColor {
    /// Pick light or dark from the background's luminance.
    #[default]
    Auto,
    Light,
    Dark,
}

impl std::fmt::Display for TextColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Light => write!(f, "light"),
            Self::Dark => write!(f, "dark"),
        }
    }
}

impl std::str::FromStr for TextColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            _ => Err(format!("Unknown text color: {s}")),
        }
    }
}

/// A user-owned label referenced by tasks and milestones.
///
/// The id is generated at creation and reused forever, locally and
/// remotely; there is no server-side id translation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    /// Background color as `#RRGGBB`.
    pub color_hex: String,
    /// Local-only presentation preference.
    pub text_color: TextColor,
    /// Unix millis of the last local mutation. Not consulted by sync.
    pub updated_at: i64,
}

impl Tag {
    /// Create a tag with a fresh client-generated id.
    #[must_use]
    pub fn new(name: impl Into<String>, color_hex: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            color_hex: color_hex.into(),
            text_color: TextColor::Auto,
            updated_at: now_ms(),
        }
    }
}
