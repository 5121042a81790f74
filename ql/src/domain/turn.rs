//! TurnRecord - one completed turn as remembered by SessionMemory

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Observation, optional reflection and the command issued for one turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRecord {
    /// Turn number, 1-indexed, gapless across the session
    pub index: u64,
    pub observation: String,
    pub reflection: Option<String>,
    pub command: String,
}

impl TurnRecord {
    /// Create a record; an empty reflection is stored as `None`
    pub fn new(index: u64, observation: impl Into<String>, reflection: Option<String>, command: impl Into<String>) -> Self {
        debug!(index, "TurnRecord::new: called");
        Self {
            index,
            observation: observation.into(),
            reflection: reflection.filter(|r| !r.trim().is_empty()),
            command: command.into(),
        }
    }

    /// Render for inclusion in a reasoning context
    pub fn render(&self) -> String {
        let mut out = format!("Turn {}:\nObs: {}\n", self.index, self.observation);
        if let Some(reflection) = &self.reflection {
            out.push_str(&format!("Ref: {}\n", reflection));
        }
        out.push_str(&format!("Cmd: {}\n", self.command));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_reflection_becomes_none() {
        let r = TurnRecord::new(1, "obs", Some("  ".to_string()), "look");
        assert_eq!(r.reflection, None);
    }

    #[test]
    fn test_render_with_and_without_reflection() {
        let plain = TurnRecord::new(2, "A dark room.", None, "north");
        assert_eq!(plain.render(), "Turn 2:\nObs: A dark room.\nCmd: north\n");

        let reflected = TurnRecord::new(3, "A lit room.", Some("Progress.".to_string()), "take lamp");
        assert_eq!(reflected.render(), "Turn 3:\nObs: A lit room.\nRef: Progress.\nCmd: take lamp\n");
    }
}
