//! Request/response types for the reasoning service
//!
//! These model a "responses"-style endpoint: one instruction string, one input
//! string, and an ordered list of output items that interleave reasoning traces
//! with message parts.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A single reasoning request - instruction plus user context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasoningRequest {
    /// System instruction
    pub instructions: String,

    /// User context blob
    pub input: String,
}

impl ReasoningRequest {
    pub fn new(instructions: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
            input: input.into(),
        }
    }
}

/// Wire body for the responses endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ResponsesBody<'a> {
    pub model: &'a str,
    pub reasoning: ReasoningOptions<'a>,
    pub instructions: &'a str,
    pub input: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReasoningOptions<'a> {
    pub effort: &'a str,
}

/// Parsed response: ordered output items
#[derive(Debug, Clone, Deserialize)]
pub struct ReasoningReply {
    pub output: Vec<OutputItem>,
}

/// One item of the response output list
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutputItem {
    /// Diagnostic trace; never part of the answer
    Reasoning {
        #[serde(default)]
        summary: Vec<serde_json::Value>,
        #[serde(default)]
        content: Option<serde_json::Value>,
    },

    /// Answer-bearing item
    Message {
        #[serde(default)]
        content: Vec<ContentPart>,
    },

    #[serde(other)]
    Other,
}

/// A part of a message item
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ContentPart {
    #[serde(rename = "output_text")]
    OutputText {
        #[serde(default)]
        text: String,
    },

    #[serde(other)]
    Other,
}

impl ReasoningReply {
    /// Concatenate the text parts of every message item, in order
    pub fn answer(&self) -> String {
        debug!(items = self.output.len(), "ReasoningReply::answer: called");
        let mut text = String::new();
        for item in &self.output {
            if let OutputItem::Message { content } = item {
                for part in content {
                    if let ContentPart::OutputText { text: t } = part {
                        text.push_str(t);
                    }
                }
            }
        }
        text.trim().to_string()
    }

    /// Reasoning traces in order; `None` entries mark traces the provider hid
    pub fn traces(&self) -> Vec<Option<String>> {
        self.output
            .iter()
            .filter_map(|item| match item {
                OutputItem::Reasoning { summary, content } => Some(render_trace(summary, content.as_ref())),
                _ => None,
            })
            .collect()
    }
}

fn render_trace(summary: &[serde_json::Value], content: Option<&serde_json::Value>) -> Option<String> {
    if !summary.is_empty() {
        let lines: Vec<String> = summary
            .iter()
            .map(|v| match v {
                serde_json::Value::String(s) => s.clone(),
                other => other
                    .get("text")
                    .and_then(|t| t.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| other.to_string()),
            })
            .collect();
        return Some(lines.join("\n"));
    }
    match content {
        Some(serde_json::Value::Null) | None => None,
        Some(serde_json::Value::String(s)) if s.is_empty() => None,
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}
