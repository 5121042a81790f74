//! StateSnapshot - coarse state derived from the status line

use serde::{Deserialize, Serialize};

/// Location reported when nothing usable could be parsed
pub const UNKNOWN_LOCATION: &str = "Unknown";

/// Location and score as shown by the environment this turn
///
/// Recomputed every turn; nothing here survives into the next perception.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub location: String,
    pub score: i64,
}

impl StateSnapshot {
    pub fn new(location: impl Into<String>, score: i64) -> Self {
        Self {
            location: location.into(),
            score,
        }
    }

    /// Whether the location is something other than the fallback
    pub fn has_location(&self) -> bool {
        !self.location.is_empty() && self.location != UNKNOWN_LOCATION
    }
}

impl Default for StateSnapshot {
    fn default() -> Self {
        Self::new(UNKNOWN_LOCATION, 0)
    }
}
