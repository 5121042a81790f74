//! WorldState - typed, validated state document
//!
//! The reasoning service proposes updates as a JSON patch. Answers are
//! untrusted: they must parse into `WorldStatePatch` (unknown fields are
//! rejected) and pass validation before anything is merged.
//!
//! Merge rules:
//! - scalars (`current_location`, `points`) overwrite
//! - lists (`progress`, `notes`, `inventory`, per-location notes) union, keeping order
//! - `drop_inventory` removes items
//! - maps (`locations`, per-location `exits`) merge key by key

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Upper bound on entries in any list of a patch
pub const MAX_LIST_LEN: usize = 200;

/// Upper bound on the length of any single text value in a patch
pub const MAX_TEXT_LEN: usize = 2_000;

/// Why a proposed patch was refused
#[derive(Debug, Error)]
pub enum StateError {
    #[error("No JSON object found in answer")]
    NoJson,

    #[error("Patch does not match schema: {0}")]
    Schema(#[from] serde_json::Error),

    #[error("Patch rejected: {0}")]
    Invalid(String),
}

/// What is known about one location
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocationInfo {
    pub notes: Vec<String>,
    /// direction -> destination
    pub exits: BTreeMap<String, String>,
}

/// The session's structured knowledge of the game world
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldState {
    pub current_location: Option<String>,
    pub locations: BTreeMap<String, LocationInfo>,
    pub inventory: Vec<String>,
    pub progress: Vec<String>,
    pub points: Option<i64>,
    pub notes: Vec<String>,
}

/// A proposed update; every field optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorldStatePatch {
    pub current_location: Option<String>,
    pub locations: BTreeMap<String, LocationInfo>,
    pub inventory: Vec<String>,
    pub drop_inventory: Vec<String>,
    pub progress: Vec<String>,
    pub points: Option<i64>,
    pub notes: Vec<String>,
}

impl WorldStatePatch {
    /// Parse a patch out of a free-form answer (bare or fenced JSON)
    pub fn from_answer(answer: &str) -> Result<Self, StateError> {
        let json = extract_json_object(answer).ok_or(StateError::NoJson)?;
        let patch: Self = serde_json::from_str(json)?;
        patch.validate()?;
        Ok(patch)
    }

    fn validate(&self) -> Result<(), StateError> {
        let lists: [(&str, &Vec<String>); 4] = [
            ("inventory", &self.inventory),
            ("drop_inventory", &self.drop_inventory),
            ("progress", &self.progress),
            ("notes", &self.notes),
        ];
        for (name, list) in lists {
            check_list(name, list)?;
        }
        if let Some(loc) = &self.current_location {
            check_text("current_location", loc)?;
        }
        if self.locations.len() > MAX_LIST_LEN {
            return Err(StateError::Invalid(format!("too many locations ({})", self.locations.len())));
        }
        for (name, info) in &self.locations {
            check_text("location name", name)?;
            check_list("location notes", &info.notes)?;
            for (direction, destination) in &info.exits {
                check_text("exit direction", direction)?;
                check_text("exit destination", destination)?;
            }
        }
        Ok(())
    }
}

fn check_text(field: &str, value: &str) -> Result<(), StateError> {
    if value.trim().is_empty() {
        return Err(StateError::Invalid(format!("{} is empty", field)));
    }
    if value.len() > MAX_TEXT_LEN {
        return Err(StateError::Invalid(format!("{} exceeds {} chars", field, MAX_TEXT_LEN)));
    }
    Ok(())
}

fn check_list(field: &str, list: &[String]) -> Result<(), StateError> {
    if list.len() > MAX_LIST_LEN {
        return Err(StateError::Invalid(format!("{} has {} entries", field, list.len())));
    }
    list.iter().try_for_each(|v| check_text(field, v))
}

/// Locate the JSON object in an answer: a ```json fence first, else the outermost braces
fn extract_json_object(answer: &str) -> Option<&str> {
    if let Some(start) = answer.find("```") {
        let after = &answer[start + 3..];
        let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after[body_start..];
        if let Some(end) = body.find("```") {
            let fenced = body[..end].trim();
            if fenced.starts_with('{') {
                return Some(fenced);
            }
        }
    }
    let start = answer.find('{')?;
    let end = answer.rfind('}')?;
    (end > start).then(|| &answer[start..=end])
}

fn union_into(target: &mut Vec<String>, items: Vec<String>) {
    for item in items {
        let item = item.trim().to_string();
        if !target.contains(&item) {
            target.push(item);
        }
    }
}

impl WorldState {
    pub fn is_empty(&self) -> bool {
        *self == WorldState::default()
    }

    /// Pretty JSON for the reasoning context; `None` while nothing is known
    pub fn render(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        serde_json::to_string_pretty(self).ok()
    }

    /// Merge a validated patch
    pub fn merge(&mut self, patch: WorldStatePatch) {
        debug!(locations = patch.locations.len(), "WorldState::merge: called");
        if let Some(loc) = patch.current_location {
            self.current_location = Some(loc.trim().to_string());
        }
        if let Some(points) = patch.points {
            self.points = Some(points);
        }
        for (name, info) in patch.locations {
            let entry = self.locations.entry(name.trim().to_string()).or_default();
            union_into(&mut entry.notes, info.notes);
            entry.exits.extend(info.exits);
        }
        union_into(&mut self.inventory, patch.inventory);
        self.inventory.retain(|item| !patch.drop_inventory.iter().any(|d| d.trim() == item));
        union_into(&mut self.progress, patch.progress);
        union_into(&mut self.notes, patch.notes);
    }

    /// Parse, validate and merge an answer; on error the document is unchanged
    pub fn apply_answer(&mut self, answer: &str) -> Result<(), StateError> {
        let patch = WorldStatePatch::from_answer(answer)?;
        self.merge(patch);
        Ok(())
    }
}
