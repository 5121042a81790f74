//! ProgressTracker - append-only ledger and session metrics
//!
//! One entry per turn. Entity names are harvested from observations as the
//! word in front of a keyword ("golden mask" -> "golden"), skipping a small
//! stoplist of determiners. The entity set only grows.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, Utc};
use eyre::{Context, Result};
use regex::Regex;
use tracing::{debug, info, warn};

use super::journal::Journal;
use crate::domain::{LedgerEntry, SessionMeta, SessionReport, StateSnapshot};

/// Words never taken as an entity name
const STOPLIST: [&str; 5] = ["a", "the", "this", "that", "your"];

/// Longest word accepted as an entity name
const MAX_ENTITY_LEN: usize = 24;

/// Fields of one turn as handed over by the loop
#[derive(Debug, Clone, Default)]
pub struct TurnUpdate {
    pub snapshot: StateSnapshot,
    pub observation: String,
    pub reflection: String,
    pub command: String,
}

/// Per-session ledger owned by the turn loop
#[derive(Debug)]
pub struct ProgressTracker {
    started: Instant,
    started_at: DateTime<Utc>,
    steps: u64,
    current_score: i64,
    visited: BTreeSet<String>,
    known_entities: BTreeSet<String>,
    timeline: Vec<LedgerEntry>,
    entity_pattern: Regex,
    journal: Option<Journal>,
}

impl ProgressTracker {
    /// Tracker recognizing `<word> <keyword>` as a named entity
    pub fn new(entity_keyword: &str) -> Result<Self> {
        debug!(%entity_keyword, "ProgressTracker::new: called");
        let pattern = format!(r"(?i)\b(\w{{1,{}}})\s+{}\b", MAX_ENTITY_LEN, regex::escape(entity_keyword.trim()));
        let entity_pattern = Regex::new(&pattern).context("Invalid entity keyword")?;
        Ok(Self {
            started: Instant::now(),
            started_at: Utc::now(),
            steps: 0,
            current_score: 0,
            visited: BTreeSet::new(),
            known_entities: BTreeSet::new(),
            timeline: Vec::new(),
            entity_pattern,
            journal: None,
        })
    }

    /// Also mirror every entry into a JSONL journal
    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn known_entities(&self) -> &BTreeSet<String> {
        &self.known_entities
    }

    pub fn timeline(&self) -> &[LedgerEntry] {
        &self.timeline
    }

    /// Entity names mentioned in `text`, lowercased
    pub fn scan_entities(&self, text: &str) -> Vec<String> {
        self.entity_pattern
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().to_lowercase())
            .filter(|word| !STOPLIST.contains(&word.as_str()))
            .collect()
    }

    /// Append one ledger entry
    pub fn update(&mut self, turn: TurnUpdate) {
        self.steps += 1;
        debug!(step = self.steps, location = %turn.snapshot.location, "ProgressTracker::update: called");

        if turn.snapshot.has_location() {
            self.visited.insert(turn.snapshot.location.clone());
        }

        for entity in self.scan_entities(&turn.observation) {
            if self.known_entities.insert(entity.clone()) {
                info!(%entity, "New entity discovered");
            }
        }
        self.current_score = turn.snapshot.score;

        let entry = LedgerEntry {
            step: self.steps,
            location: turn.snapshot.location,
            score: turn.snapshot.score,
            observation: turn.observation,
            reflection: turn.reflection,
            command: turn.command,
            known_entities: self.known_entities.clone(),
        };

        if let Some(journal) = self.journal.as_mut()
            && let Err(e) = journal.append(&entry)
        {
            warn!(error = %e, "Failed to append journal entry");
        }
        self.timeline.push(entry);
    }

    /// Compute the session metrics and persist the report
    ///
    /// Consumes the tracker, so a session can only be finalized once.
    pub fn finalize(self, path: &Path) -> Result<SessionReport> {
        let duration = self.started.elapsed().as_secs_f64();
        let meta = SessionMeta {
            total_steps: self.steps,
            duration_seconds: (duration * 100.0).round() / 100.0,
            unique_locations: self.visited.len(),
            final_score: self.current_score,
            known_entities: self.known_entities,
            started_at: Some(self.started_at),
            finished_at: Some(Utc::now()),
        };
        let report = SessionReport {
            meta,
            timeline: self.timeline,
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).context(format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(path, json).context(format!("Failed to write report {}", path.display()))?;
        info!(
            steps = report.meta.total_steps,
            rooms = report.meta.unique_locations,
            score = report.meta.final_score,
            "Saved session report to {}",
            path.display()
        );
        Ok(report)
    }
}

/// Read a report written by [`ProgressTracker::finalize`]
pub fn load_report(path: &Path) -> Result<SessionReport> {
    debug!(?path, "load_report: called");
    let content = fs::read_to_string(path).context(format!("Failed to read report {}", path.display()))?;
    serde_json::from_str(&content).context(format!("Failed to parse report {}", path.display()))
}
