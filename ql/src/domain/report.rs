//! Ledger and report types
//!
//! Field names follow the persisted JSON format (`room`, `reasoning`,
//! `known_mask_names`, ...), so saved reports stay readable by existing
//! tooling.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the append-only progress ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub step: u64,
    #[serde(rename = "room")]
    pub location: String,
    pub score: i64,
    pub observation: String,
    #[serde(rename = "reasoning")]
    pub reflection: String,
    pub command: String,
    #[serde(rename = "known_mask_names")]
    pub known_entities: BTreeSet<String>,
}

/// Derived session metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMeta {
    pub total_steps: u64,
    pub duration_seconds: f64,
    #[serde(rename = "total_unique_rooms")]
    pub unique_locations: usize,
    pub final_score: i64,
    #[serde(rename = "masks_seen")]
    pub known_entities: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

/// Everything persisted at shutdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub meta: SessionMeta,
    pub timeline: Vec<LedgerEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_uses_persisted_field_names() {
        let report = SessionReport {
            meta: SessionMeta {
                total_steps: 1,
                duration_seconds: 1.25,
                unique_locations: 1,
                final_score: 2,
                known_entities: BTreeSet::from(["golden".to_string()]),
                started_at: None,
                finished_at: None,
            },
            timeline: vec![LedgerEntry {
                step: 1,
                location: "Cell".to_string(),
                score: 2,
                observation: "A golden mask glints.".to_string(),
                reflection: String::new(),
                command: "take mask".to_string(),
                known_entities: BTreeSet::from(["golden".to_string()]),
            }],
        };

        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["meta"]["total_unique_rooms"], 1);
        assert_eq!(v["meta"]["masks_seen"][0], "golden");
        assert!(v["meta"].get("started_at").is_none());
        assert_eq!(v["timeline"][0]["room"], "Cell");
        assert_eq!(v["timeline"][0]["reasoning"], "");
        assert_eq!(v["timeline"][0]["known_mask_names"][0], "golden");
    }
}
