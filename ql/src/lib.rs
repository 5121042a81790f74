//! QuestLoop - autonomous text adventure player
//!
//! QuestLoop plays a browser-hosted interactive fiction game turn by turn:
//! it reads what the game printed since the last command, asks a reasoning
//! model what to do next, submits the answer and records everything.
//!
//! # Core Concepts
//!
//! - **Incremental perception**: only text produced since the last command is observed
//! - **Bounded memory**: recent turns are folded into a running summary
//! - **Degrade, don't crash**: failed reads and failed calls become sentinels
//! - **Always finalize**: the report is written and the browser closed exactly once
//!
//! # Modules
//!
//! - [`transcript`] - the rendered game surface (WebDriver)
//! - [`perception`] - observation extraction and status parsing
//! - [`llm`] - reasoning service transport and retrying client
//! - [`memory`] - rolling turn window, summary, world state and plan
//! - [`r#loop`] - the turn orchestrator
//! - [`progress`] - ledger, metrics and report
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod cli;
pub mod config;
pub mod domain;
pub mod llm;
pub mod memory;
pub mod perception;
pub mod progress;
pub mod prompts;
pub mod transcript;

// Note: 'loop' is a reserved keyword, so we use r#loop
#[path = "loop/mod.rs"]
pub mod r#loop;

// Re-export commonly used types
pub use config::Config;
pub use domain::{LedgerEntry, SessionMeta, SessionReport, StateSnapshot, TurnRecord};
pub use llm::{LlmClient, LlmError, ReasoningClient, ReasoningReply, ReasoningRequest, create_client};
pub use memory::{CompactionOutcome, SessionMemory, WorldState};
pub use perception::{IncrementalExtractor, StatusParser, StatusView};
pub use progress::{ProgressTracker, TurnUpdate};
pub use prompts::PromptSet;
pub use r#loop::{SessionOutcome, StopReason, TurnOrchestrator, TurnState};
pub use transcript::{TranscriptError, TranscriptSource, WebDriverTranscript};
