//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// Short analysis of the latest observation
pub const REFLECTION: &str = include_str!("../../prompts/reflection.pmt");

/// Next game command
pub const COMMAND: &str = include_str!("../../prompts/command.pmt");

/// Fold recent turns into the running summary
pub const SUMMARY: &str = include_str!("../../prompts/summary.pmt");

/// JSON patch for the world-state document
pub const WORLD_STATE: &str = include_str!("../../prompts/world_state.pmt");

/// Revised goal list
pub const PLANNING: &str = include_str!("../../prompts/planning.pmt");

/// Names of every embedded prompt
pub const NAMES: [&str; 5] = ["reflection", "command", "summary", "world_state", "planning"];

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "reflection" => Some(REFLECTION),
        "command" => Some(COMMAND),
        "summary" => Some(SUMMARY),
        "world_state" => Some(WORLD_STATE),
        "planning" => Some(PLANNING),
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_name_is_embedded() {
        for name in NAMES {
            let prompt = get_embedded(name).unwrap();
            assert!(!prompt.trim().is_empty(), "{} is empty", name);
        }
    }

    #[test]
    fn test_command_prompt_demands_bare_command() {
        assert!(COMMAND.contains("Output ONLY the command"));
        assert!(REFLECTION.contains("max 2 sentences"));
        assert!(SUMMARY.contains("chronological"));
        assert!(WORLD_STATE.contains("drop_inventory"));
        assert!(PLANNING.contains("3-5"));
        assert!(COMMAND.contains("first goal"));
    }

    #[test]
    fn test_get_embedded_unknown() {
        assert!(get_embedded("plan").is_none());
    }
}
