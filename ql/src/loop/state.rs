//! Turn states and session outcome

use crate::domain::SessionReport;

/// Where the orchestrator is within a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Init,
    Perceive,
    MaybeCompact,
    MaybeReflect,
    Decide,
    Sanitize,
    Act,
    Record,
    Terminated,
}

impl std::fmt::Display for TurnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Init => "INIT",
            Self::Perceive => "PERCEIVE",
            Self::MaybeCompact => "MAYBE_COMPACT",
            Self::MaybeReflect => "MAYBE_REFLECT",
            Self::Decide => "DECIDE",
            Self::Sanitize => "SANITIZE",
            Self::Act => "ACT",
            Self::Record => "RECORD",
            Self::Terminated => "TERMINATED",
        };
        write!(f, "{}", name)
    }
}

/// Why the turn loop stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The decided command was a termination keyword
    QuitCommand,
    /// Configured turn bound reached
    MaxTurns,
    /// Interrupt signal observed
    Interrupted,
    /// Unrecoverable error; the message is for the operator
    Fatal(String),
}

impl StopReason {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QuitCommand => write!(f, "quit command"),
            Self::MaxTurns => write!(f, "turn limit reached"),
            Self::Interrupted => write!(f, "interrupted"),
            Self::Fatal(msg) => write!(f, "fatal error: {}", msg),
        }
    }
}

/// Result of a finished session: how it ended and the persisted report
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub stop: StopReason,
    pub report: SessionReport,
}
