//! PromptSet - the instructions a session uses
//!
//! Each prompt resolves from `<prompts_dir>/<name>.pmt` when an override
//! directory is configured and the file exists, else from the embedded default.

use std::path::{Path, PathBuf};

use eyre::{Context, Result};
use tracing::{debug, info};

use super::embedded;

/// Resolved instructions for one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSet {
    pub reflection: String,
    pub command: String,
    pub summary: String,
    pub world_state: String,
    pub planning: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self::embedded()
    }
}

impl PromptSet {
    /// Embedded defaults only
    pub fn embedded() -> Self {
        debug!("PromptSet::embedded: called");
        Self {
            reflection: embedded::REFLECTION.to_string(),
            command: embedded::COMMAND.to_string(),
            summary: embedded::SUMMARY.to_string(),
            world_state: embedded::WORLD_STATE.to_string(),
            planning: embedded::PLANNING.to_string(),
        }
    }

    /// Resolve every prompt, preferring files under `dir`
    pub fn load(dir: Option<&Path>) -> Result<Self> {
        debug!(?dir, "PromptSet::load: called");
        let Some(dir) = dir else {
            return Ok(Self::embedded());
        };
        Ok(Self {
            reflection: load_template(dir, "reflection")?,
            command: load_template(dir, "command")?,
            summary: load_template(dir, "summary")?,
            world_state: load_template(dir, "world_state")?,
            planning: load_template(dir, "planning")?,
        })
    }
}

/// One prompt: override file if present, else the embedded default
fn load_template(dir: &Path, name: &str) -> Result<String> {
    let path: PathBuf = dir.join(format!("{}.pmt", name));
    if path.exists() {
        info!("Using prompt override {}", path.display());
        let content =
            std::fs::read_to_string(&path).context(format!("Failed to read prompt {}", path.display()))?;
        if content.trim().is_empty() {
            eyre::bail!("Prompt override {} is empty", path.display());
        }
        return Ok(content);
    }
    debug!(?path, "load_template: no override, using embedded");
    embedded::get_embedded(name)
        .map(str::to_string)
        .ok_or_else(|| eyre::eyre!("Prompt template not found: {}", name))
}
