//! Perception: turning a rendered transcript into an observation and a snapshot
//!
//! - [`IncrementalExtractor`] - text produced since the last accepted command
//! - [`StatusParser`] - location/score from the status line, with fallbacks

mod extractor;
mod status;

use thiserror::Error;

pub use extractor::{EMPHASIS_SELECTOR, IncrementalExtractor, PERCEPTION_FAILED};
pub use status::{BASELINE_SCORE, DEFAULT_STATUS_PATTERN, ParsedStatus, RegexGrammar, StatusGrammar, StatusParser, StatusView};

/// Errors raised while building perception components or applying a grammar
#[derive(Debug, Error)]
pub enum PerceptionError {
    #[error("Invalid selector '{0}'")]
    InvalidSelector(String),

    #[error("Invalid status grammar: {0}")]
    InvalidGrammar(String),

    #[error("Score '{0}' is not a valid integer")]
    InvalidScore(String),
}
