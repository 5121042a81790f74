//! SessionMemory - rolling turn window plus one running summary
//!
//! The window is a soft cap: compaction is attempted whenever it is at or over
//! `limit`, and a failed attempt leaves everything as it was so the next turn
//! can try again.

use tracing::{debug, info, warn};

use super::{Plan, WorldState};
use crate::domain::TurnRecord;
use crate::llm::ReasoningClient;

/// Summary a fresh session starts from
pub const INITIAL_SUMMARY: &str = "The game has just started.";

/// Result of a compaction attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompactionOutcome {
    /// Window below the limit; nothing attempted
    NotNeeded,
    /// Summary replaced and window emptied
    Compacted { turns_folded: usize, summary_len: usize },
    /// Summarization produced nothing; state untouched
    Failed { window_len: usize },
}

/// Context memory owned by the turn loop
#[derive(Debug, Clone)]
pub struct SessionMemory {
    summary: String,
    recent_turns: Vec<TurnRecord>,
    limit: usize,
    turns_recorded: u64,
    world: WorldState,
    plan: Plan,
}

impl SessionMemory {
    pub fn new(limit: usize) -> Self {
        debug!(limit, "SessionMemory::new: called");
        Self {
            summary: INITIAL_SUMMARY.to_string(),
            recent_turns: Vec::new(),
            limit: limit.max(1),
            turns_recorded: 0,
            world: WorldState::default(),
            plan: Plan::default(),
        }
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn recent_turns(&self) -> &[TurnRecord] {
        &self.recent_turns
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut WorldState {
        &mut self.world
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn plan_mut(&mut self) -> &mut Plan {
        &mut self.plan
    }

    /// Index the next appended record must carry
    pub fn next_index(&self) -> u64 {
        self.turns_recorded + 1
    }

    /// Whether the window is at or over the limit
    pub fn needs_compaction(&self) -> bool {
        self.recent_turns.len() >= self.limit
    }

    /// Summary, world state and plan (if any) and recent turns, ready for a reasoning call
    pub fn context_view(&self) -> String {
        let mut out = format!("PREVIOUS GAME SUMMARY:\n{}\n\n", self.summary);
        if let Some(world) = self.world.render() {
            out.push_str(&format!("KNOWN WORLD STATE:\n{}\n\n", world));
        }
        if let Some(plan) = self.plan.render() {
            out.push_str(&format!("CURRENT PLAN:\n{}\n\n", plan));
        }
        out.push_str("RECENT HISTORY:\n");
        for turn in &self.recent_turns {
            out.push_str(&turn.render());
        }
        out
    }

    /// Append a completed turn
    pub fn append_turn(&mut self, record: TurnRecord) {
        debug_assert_eq!(record.index, self.next_index(), "turn indices must be gapless");
        debug!(index = record.index, window = self.recent_turns.len() + 1, "append_turn: called");
        self.turns_recorded = record.index;
        self.recent_turns.push(record);
    }

    /// Fold the window into the summary if it is at or over the limit
    ///
    /// The summary and the window change together or not at all.
    pub async fn maybe_compact(&mut self, reasoner: &ReasoningClient, instruction: &str) -> CompactionOutcome {
        if !self.needs_compaction() {
            return CompactionOutcome::NotNeeded;
        }
        info!(window = self.recent_turns.len(), limit = self.limit, ">> Triggering memory summarization");

        let new_summary = reasoner.call(instruction, &self.context_view()).await;
        if new_summary.trim().is_empty() {
            warn!(
                window = self.recent_turns.len(),
                "Summarization returned nothing; keeping window until next attempt"
            );
            return CompactionOutcome::Failed {
                window_len: self.recent_turns.len(),
            };
        }

        let turns_folded = self.recent_turns.len();
        self.summary = new_summary;
        self.recent_turns.clear();
        info!(summary_len = self.summary.len(), turns_folded, ">> Memory updated");
        CompactionOutcome::Compacted {
            turns_folded,
            summary_len: self.summary.len(),
        }
    }
}
