//! StatusParser - coarse state from the compact status line
//!
//! The grammar is pluggable per environment. Whatever the grammar, the
//! fallback chain is the same: the whole status line as the location, then the
//! last emphasized fragment of the transcript, then "Unknown".

use regex::Regex;
use tracing::{debug, warn};

use super::PerceptionError;
use crate::domain::{StateSnapshot, UNKNOWN_LOCATION};

/// Default grammar: `<location> <score> of <max>` anchored at the start
pub const DEFAULT_STATUS_PATTERN: &str = r"^\s*(?P<location>.+?)\s+(?P<score>-?\d+)\s+of\s+\d+";

/// Score used whenever no numeric score can be read
pub const BASELINE_SCORE: i64 = 0;

/// Raw inputs the parser works from, as read from the surface this turn
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusView {
    /// Status line text; `None` when the surface shows none
    pub status_line: Option<String>,

    /// Last emphasized fragment inside the main content
    pub emphasis: Option<String>,
}

/// An environment-specific status-line grammar
pub trait StatusGrammar: Send + Sync {
    /// `Ok(None)` means "did not match"; `Err` means the match was unusable
    fn parse(&self, status: &str) -> Result<Option<StateSnapshot>, PerceptionError>;
}

/// Regex grammar with named groups `location` and `score`
#[derive(Debug, Clone)]
pub struct RegexGrammar {
    pattern: Regex,
}

impl RegexGrammar {
    pub fn new(pattern: &str) -> Result<Self, PerceptionError> {
        debug!(%pattern, "RegexGrammar::new: called");
        let pattern = Regex::new(pattern).map_err(|e| PerceptionError::InvalidGrammar(e.to_string()))?;
        let names: Vec<&str> = pattern.capture_names().flatten().collect();
        for required in ["location", "score"] {
            if !names.contains(&required) {
                return Err(PerceptionError::InvalidGrammar(format!("missing named group '{}'", required)));
            }
        }
        Ok(Self { pattern })
    }
}

impl Default for RegexGrammar {
    fn default() -> Self {
        Self {
            pattern: Regex::new(DEFAULT_STATUS_PATTERN).expect("default status pattern compiles"),
        }
    }
}

impl StatusGrammar for RegexGrammar {
    fn parse(&self, status: &str) -> Result<Option<StateSnapshot>, PerceptionError> {
        let Some(caps) = self.pattern.captures(status) else {
            return Ok(None);
        };
        let location = caps.name("location").map(|m| m.as_str().trim()).unwrap_or_default();
        let raw_score = caps.name("score").map(|m| m.as_str()).unwrap_or_default();
        let score = raw_score
            .parse::<i64>()
            .map_err(|_| PerceptionError::InvalidScore(raw_score.to_string()))?;
        Ok(Some(StateSnapshot::new(location, score)))
    }
}

/// A snapshot plus whether its score was actually read from the status line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedStatus {
    pub snapshot: StateSnapshot,
    pub score_found: bool,
}

impl ParsedStatus {
    fn fallback(location: &str) -> Self {
        Self {
            snapshot: StateSnapshot::new(location, BASELINE_SCORE),
            score_found: false,
        }
    }
}

/// Derives a StateSnapshot from a StatusView
pub struct StatusParser {
    grammar: Box<dyn StatusGrammar>,
}

impl StatusParser {
    pub fn new(grammar: Box<dyn StatusGrammar>) -> Self {
        Self { grammar }
    }

    /// Parser using a regex grammar
    pub fn with_pattern(pattern: &str) -> Result<Self, PerceptionError> {
        Ok(Self::new(Box::new(RegexGrammar::new(pattern)?)))
    }

    /// Never fails: unusable input degrades to `{Unknown, BASELINE_SCORE}`
    pub fn parse(&self, view: &StatusView) -> StateSnapshot {
        self.parse_status(view).snapshot
    }

    /// Like [`parse`](Self::parse), also reporting whether the grammar supplied the score
    pub fn parse_status(&self, view: &StatusView) -> ParsedStatus {
        debug!(?view, "StatusParser::parse_status: called");
        match self.try_parse(view) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "Status parse failed, using default snapshot");
                ParsedStatus::fallback(UNKNOWN_LOCATION)
            }
        }
    }

    fn try_parse(&self, view: &StatusView) -> Result<ParsedStatus, PerceptionError> {
        let status = view.status_line.as_deref().map(str::trim).filter(|s| !s.is_empty());

        if let Some(status) = status {
            if let Some(snapshot) = self.grammar.parse(status)?
                && !snapshot.location.is_empty()
            {
                debug!(?snapshot, "try_parse: grammar matched");
                return Ok(ParsedStatus {
                    snapshot,
                    score_found: true,
                });
            }
            debug!("try_parse: grammar did not match, using status line verbatim");
            return Ok(ParsedStatus::fallback(status));
        }

        match view.emphasis.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(fragment) => {
                debug!(%fragment, "try_parse: no status line, using emphasized fragment");
                Ok(ParsedStatus::fallback(fragment))
            }
            None => Ok(ParsedStatus::fallback(UNKNOWN_LOCATION)),
        }
    }
}

impl Default for StatusParser {
    fn default() -> Self {
        Self::new(Box::new(RegexGrammar::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(status: Option<&str>, emphasis: Option<&str>) -> StatusView {
        StatusView {
            status_line: status.map(str::to_string),
            emphasis: emphasis.map(str::to_string),
        }
    }

    #[test]
    fn test_parses_location_and_score() {
        let snap = StatusParser::default().parse(&view(Some(" Mountain Pool     1 of 7 "), None));
        assert_eq!(snap, StateSnapshot::new("Mountain Pool", 1));
    }

    #[test]
    fn test_location_containing_digits() {
        let snap = StatusParser::default().parse(&view(Some("Room 101   3 of 12"), None));
        assert_eq!(snap, StateSnapshot::new("Room 101", 3));
    }

    #[test]
    fn test_non_matching_status_used_verbatim() {
        let snap = StatusParser::default().parse(&view(Some("  Mountain Pool  "), Some("Cell")));
        assert_eq!(snap, StateSnapshot::new("Mountain Pool", BASELINE_SCORE));
    }

    #[test]
    fn test_missing_status_falls_back_to_emphasis() {
        let snap = StatusParser::default().parse(&view(None, Some("Cell")));
        assert_eq!(snap, StateSnapshot::new("Cell", BASELINE_SCORE));

        let snap = StatusParser::default().parse(&view(Some("   "), Some("Cell")));
        assert_eq!(snap.location, "Cell");
    }

    #[test]
    fn test_nothing_available_is_unknown() {
        let snap = StatusParser::default().parse(&view(None, None));
        assert_eq!(snap, StateSnapshot::default());
    }

    #[test]
    fn test_overflowing_score_yields_default_snapshot() {
        let snap = StatusParser::default().parse(&view(Some("Vault 99999999999999999999999 of 7"), None));
        assert_eq!(snap, StateSnapshot::new(UNKNOWN_LOCATION, BASELINE_SCORE));
    }

    #[test]
    fn test_parse_status_reports_score_source() {
        let parser = StatusParser::default();
        assert!(parser.parse_status(&view(Some("Cell 2 of 7"), None)).score_found);
        assert!(!parser.parse_status(&view(Some("Cell"), None)).score_found);
        assert!(!parser.parse_status(&view(None, None)).score_found);
    }

    #[test]
    fn test_custom_grammar() {
        let parser = StatusParser::with_pattern(r"^Score:\s*(?P<score>\d+)\s+Room:\s*(?P<location>.+)$").unwrap();
        let snap = parser.parse(&view(Some("Score: 40 Room: West of House"), None));
        assert_eq!(snap, StateSnapshot::new("West of House", 40));
    }

    #[test]
    fn test_grammar_requires_named_groups() {
        assert!(RegexGrammar::new(r"^(.+) (\d+)$").is_err());
        assert!(RegexGrammar::new(r"(unclosed").is_err());
    }
}
