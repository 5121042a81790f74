//! IncrementalExtractor - "new since last command" delta of a full render
//!
//! The transcript is re-rendered in full every turn. Each processed player
//! command is wrapped in a marker element; whatever follows the container of
//! the most recent marker is the environment's response to it.

use scraper::{ElementRef, Html, Node, Selector};
use tracing::debug;

use super::PerceptionError;

/// Observation used when the transcript could not be read this turn
pub const PERCEPTION_FAILED: &str = "Error extracting game text.";

/// Elements treated as emphasized (bold) fragments
pub const EMPHASIS_SELECTOR: &str = "b, strong, .Style_subheader, .Style_header";

/// Computes the unseen part of a transcript render
#[derive(Debug, Clone)]
pub struct IncrementalExtractor {
    marker: Selector,
    emphasis: Selector,
}

impl IncrementalExtractor {
    /// Build an extractor for markers carrying `marker_class`
    pub fn new(marker_class: &str) -> Result<Self, PerceptionError> {
        debug!(%marker_class, "IncrementalExtractor::new: called");
        let class = marker_class.trim_start_matches('.');
        let css = format!(".{}", class);
        // The CSS parser repairs input like `bad[class`, so check the class name itself
        if class.is_empty() || !class.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(PerceptionError::InvalidSelector(css));
        }
        let marker = Selector::parse(&css).map_err(|_| PerceptionError::InvalidSelector(css.clone()))?;
        let emphasis =
            Selector::parse(EMPHASIS_SELECTOR).map_err(|_| PerceptionError::InvalidSelector(EMPHASIS_SELECTOR.into()))?;
        Ok(Self { marker, emphasis })
    }

    /// Text produced since the rightmost marker, or the whole text if there is none
    pub fn extract(&self, markup: &str) -> String {
        debug!(markup_len = markup.len(), "extract: called");
        let fragment = Html::parse_fragment(markup);

        let Some(last_marker) = fragment.select(&self.marker).last() else {
            debug!("extract: no markers, returning full text");
            return visible_text(fragment.root_element());
        };

        let Some(container) = last_marker.parent() else {
            debug!("extract: marker has no container");
            return String::new();
        };

        let pieces: Vec<String> = container
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .map(visible_text)
            .filter(|t| !t.is_empty())
            .collect();
        debug!(sibling_count = pieces.len(), "extract: collected siblings");
        pieces.join(" ").trim().to_string()
    }

    /// Text of the last emphasized fragment in the render, if any
    pub fn last_emphasis(&self, markup: &str) -> Option<String> {
        let fragment = Html::parse_fragment(markup);
        fragment
            .select(&self.emphasis)
            .map(visible_text)
            .filter(|t| !t.is_empty())
            .last()
    }
}

/// Whitespace-normalized text of a subtree, skipping script/style content
fn visible_text(el: ElementRef<'_>) -> String {
    let mut words = Vec::new();
    collect_text(el, &mut words);
    words.join(" ")
}

fn collect_text<'a>(el: ElementRef<'a>, out: &mut Vec<&'a str>) {
    if matches!(el.value().name(), "script" | "style" | "noscript") {
        return;
    }
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.extend(text.split_whitespace()),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, out);
                }
            }
            _ => {}
        }
    }
}
