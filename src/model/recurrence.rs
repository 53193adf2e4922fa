//! Recurrence rules for repeating tasks.

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

/// How often a task repeats.
///
/// Serialized as the lowercase name on the wire (`recurrence_rule`
/// column); an unrecognized value in a remote row is a decode error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceRule {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RecurrenceRule {
    /// Lowercase wire name.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    /// Next occurrence after `from_ms` (Unix millis).
    ///
    /// Monthly and yearly steps clamp to the last valid day of the
    /// target month (Jan 31 + 1 month = Feb 28/29).
    #[must_use]
    pub fn next_from(&self, from_ms: i64) -> i64 {
        let Some(dt) = DateTime::<Utc>::from_timestamp_millis(from_ms) else {
            return from_ms;
        };
        let next = match self {
            Self::Daily => dt + Duration::days(1),
            Self::Weekly => dt + Duration::days(7),
            Self::Monthly => dt.checked_add_months(Months::new(1)).unwrap_or(dt),
            Self::Yearly => dt.checked_add_months(Months::new(12)).unwrap_or(dt),
        };
        next.timestamp_millis()
    }
}

impl std::fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RecurrenceRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            _ => Err(format!("Unknown recurrence rule: {s}")),
        }
    }
}
