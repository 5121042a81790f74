//! Domain types for QuestLoop
//!
//! Per-turn records, the coarse state snapshot, and the ledger/report types
//! persisted at shutdown.

mod report;
mod snapshot;
mod turn;

pub use report::{LedgerEntry, SessionMeta, SessionReport};
pub use snapshot::{StateSnapshot, UNKNOWN_LOCATION};
pub use turn::TurnRecord;
