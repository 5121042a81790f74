//! Turn loop for QuestLoop
//!
//! The orchestrator owns the session: it perceives the game, keeps memory,
//! asks the reasoning service for a command, submits it and records the turn.
//! Only one turn is ever in flight.

mod command;
mod orchestrator;
mod state;

pub use command::{is_quit_command, sanitize_command};
pub use orchestrator::TurnOrchestrator;
pub use state::{SessionOutcome, StopReason, TurnState};
