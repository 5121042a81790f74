//! Plan - short ordered goal list revised after every turn
//!
//! The answer is free text; each non-empty line that is not a heading becomes
//! one goal once its list marker ("1.", "2)", "-", "*") is stripped.

use tracing::debug;

/// Goals kept at once; extra lines in an answer are dropped
pub const MAX_GOALS: usize = 5;

/// Characters kept per goal
const MAX_GOAL_LEN: usize = 300;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    goals: Vec<String>,
}

impl Plan {
    /// Parse a numbered or bulleted list
    pub fn from_answer(answer: &str) -> Self {
        let goals: Vec<String> = answer
            .lines()
            .map(strip_list_marker)
            .filter(|line| !line.is_empty() && !line.ends_with(':'))
            .map(|line| line.chars().take(MAX_GOAL_LEN).collect())
            .take(MAX_GOALS)
            .collect();
        debug!(goals = goals.len(), "Plan::from_answer: parsed");
        Self { goals }
    }

    pub fn goals(&self) -> &[String] {
        &self.goals
    }

    /// Goal the next command should work towards
    pub fn next_goal(&self) -> Option<&str> {
        self.goals.first().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.goals.is_empty()
    }

    /// Replace the goals from an answer; an answer without goals keeps the current plan
    pub fn revise(&mut self, answer: &str) -> bool {
        let revised = Self::from_answer(answer);
        if revised.is_empty() {
            return false;
        }
        *self = revised;
        true
    }

    /// Numbered list for the reasoning context; `None` while there is no plan
    pub fn render(&self) -> Option<String> {
        if self.goals.is_empty() {
            return None;
        }
        let lines: Vec<String> = self
            .goals
            .iter()
            .enumerate()
            .map(|(i, goal)| format!("{}. {}", i + 1, goal))
            .collect();
        Some(lines.join("\n"))
    }
}

fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix(['-', '*']) {
        return rest.trim();
    }
    let digits = line.len() - line.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix(['.', ')']) {
            return rest.trim();
        }
    }
    line
}
