//! Session progress: the per-turn ledger, its metrics and the optional journal

mod journal;
mod tracker;

pub use journal::{Journal, read_journal};
pub use tracker::{ProgressTracker, TurnUpdate, load_report};
