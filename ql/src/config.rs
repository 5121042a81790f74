//! QuestLoop configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main QuestLoop configuration
///
/// Built once at startup and handed by reference to each component.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Interactive surface (browser) settings
    pub game: GameConfig,

    /// Reasoning service settings
    pub api: ApiConfig,

    /// Turn loop behavior
    pub agent: AgentConfig,

    /// Report persistence
    pub report: ReportConfig,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub log_level: Option<String>,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        self.api.resolve_key()?;
        if self.game.url.trim().is_empty() {
            return Err(eyre::eyre!("game.url must not be empty"));
        }
        if self.agent.memory_limit == 0 {
            return Err(eyre::eyre!("agent.memory_limit must be at least 1"));
        }
        crate::perception::RegexGrammar::new(&self.game.status_pattern).context("game.status_pattern is unusable")?;
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: ./questloop.yml
        let local_config = PathBuf::from("questloop.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/questloop/questloop.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("questloop").join("questloop.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is set up; errors are ignored
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        Self::load(config_path).ok().and_then(|c| c.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        // YAML is a superset of JSON, so settings.json files parse here too
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Interactive surface configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Page hosting the game
    pub url: String,

    /// Run the browser without a window
    pub headless: bool,

    /// WebDriver endpoint (chromedriver, geckodriver, ...)
    pub webdriver_url: String,

    /// Bounded wait for an element to appear, in milliseconds
    pub ready_timeout_ms: u64,

    /// Wait after submitting a command, in milliseconds
    pub settle_ms: u64,

    /// Element whose presence marks the page as loaded
    pub ready_selector: String,

    /// Element holding the transcript
    pub content_selector: String,

    /// Command line input element
    pub input_selector: String,

    /// Element holding the status line
    pub status_selector: String,

    /// Class of the element wrapping an already-processed player command
    pub marker_class: String,

    /// Status-line grammar: regex with named groups `location` and `score`
    pub status_pattern: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            url: "https://eblong.com/zarf/zweb/dreamhold/".to_string(),
            headless: false,
            webdriver_url: "http://localhost:9515".to_string(),
            ready_timeout_ms: 10_000,
            settle_ms: 1_500,
            ready_selector: "#parchment".to_string(),
            content_selector: "#content".to_string(),
            input_selector: "input.z-roman".to_string(),
            status_selector: ".GridWindow".to_string(),
            marker_class: "finished-input".to_string(),
            status_pattern: crate::perception::DEFAULT_STATUS_PATTERN.to_string(),
        }
    }
}

/// Reasoning service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API key given inline
    pub key: Option<String>,

    /// Environment variable consulted when `key` is absent
    pub key_env: String,

    /// API base URL
    pub base_url: String,

    /// Model identifier
    pub model: String,

    /// Reasoning effort hint (low, medium, high)
    pub reasoning_effort: String,

    /// Per-attempt timeout in milliseconds
    pub timeout_ms: u64,

    /// Attempts per call before giving up
    pub max_attempts: u32,

    /// Fixed delay between attempts in milliseconds
    pub retry_delay_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            key: None,
            key_env: "OPENROUTER_API_KEY".to_string(),
            base_url: "https://openrouter.ai/api/v1".to_string(),
            model: "openai/o4-mini".to_string(),
            reasoning_effort: "low".to_string(),
            timeout_ms: 120_000,
            max_attempts: crate::llm::DEFAULT_MAX_ATTEMPTS,
            retry_delay_ms: crate::llm::DEFAULT_RETRY_DELAY.as_millis() as u64,
        }
    }
}

impl ApiConfig {
    /// Inline key wins, then the environment variable
    pub fn resolve_key(&self) -> Result<String> {
        if let Some(key) = self.key.as_ref().filter(|k| !k.trim().is_empty()) {
            return Ok(key.clone());
        }
        std::env::var(&self.key_env).map_err(|_| {
            eyre::eyre!(
                "API key not found. Set api.key in the config or the {} environment variable.",
                self.key_env
            )
        })
    }
}

/// Turn loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Recent turns kept before compaction is attempted
    pub memory_limit: usize,

    /// Ask for a reflection before each command
    pub use_reflection: bool,

    /// Maintain the typed world-state document
    pub use_world_state: bool,

    /// Revise a short goal list after every turn
    pub use_planning: bool,

    /// Stop after this many turns
    pub max_turns: Option<u32>,

    /// Submitted when the decided command sanitizes to nothing
    pub idle_command: String,

    /// Commands that end the session instead of being submitted
    pub quit_keywords: Vec<String>,

    /// Keep the previous score when the status line does not parse
    pub carry_score_on_parse_failure: bool,

    /// Word the entity scanner looks for ("<name> mask")
    pub entity_keyword: String,

    /// Directory with `<name>.pmt` files overriding the embedded prompts
    pub prompts_dir: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            memory_limit: 100,
            use_reflection: false,
            use_world_state: false,
            use_planning: false,
            max_turns: None,
            idle_command: "look".to_string(),
            quit_keywords: vec!["quit".to_string(), "exit".to_string()],
            carry_score_on_parse_failure: false,
            entity_keyword: "mask".to_string(),
            prompts_dir: None,
        }
    }
}

/// Report persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Final JSON report, written once at shutdown
    pub path: PathBuf,

    /// Optional JSONL journal appended every turn
    pub journal_path: Option<PathBuf>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("benchmark_data.json"),
            journal_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.agent.memory_limit, 100);
        assert!(!config.agent.use_reflection);
        assert!(!config.agent.use_planning);
        assert_eq!(config.api.max_attempts, 3);
        assert_eq!(config.api.retry_delay_ms, 5_000);
        assert_eq!(config.agent.quit_keywords, vec!["quit", "exit"]);
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
game:
  url: https://example.com/game/
  headless: true
api:
  key: sk-test
  model: anthropic/claude-sonnet-4
  reasoning_effort: high
agent:
  memory_limit: 20
  use_reflection: true
  use_planning: true
  max_turns: 300
report:
  path: out/run.json
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.game.url, "https://example.com/game/");
        assert!(config.game.headless);
        assert_eq!(config.api.resolve_key().unwrap(), "sk-test");
        assert_eq!(config.api.reasoning_effort, "high");
        assert_eq!(config.agent.memory_limit, 20);
        assert!(config.agent.use_reflection);
        assert!(config.agent.use_planning);
        assert_eq!(config.agent.max_turns, Some(300));
        assert_eq!(config.report.path, PathBuf::from("out/run.json"));
    }

    #[test]
    fn test_json_settings_file_parses() {
        let json = r#"{"game": {"url": "https://x/"}, "api": {"key": "k", "model": "m"}}"#;
        let config: Config = serde_yaml::from_str(json).unwrap();

        assert_eq!(config.game.url, "https://x/");
        assert_eq!(config.api.model, "m");
        // Defaults for unspecified
        assert_eq!(config.game.settle_ms, 1_500);
        assert_eq!(config.agent.idle_command, "look");
    }

    #[test]
    fn test_validate_rejects_zero_memory_limit() {
        let mut config = Config::default();
        config.api.key = Some("k".to_string());
        config.agent.memory_limit = 0;
        assert!(config.validate().is_err());

        config.agent.memory_limit = 5;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_status_pattern() {
        let mut config = Config::default();
        config.api.key = Some("k".to_string());
        config.game.status_pattern = "(unclosed".to_string();
        assert!(config.validate().is_err());

        // Compiles, but lacks the named groups
        config.game.status_pattern = r"^(.+) (\d+)$".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_explicit_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("questloop.yml");
        fs::write(&path, "agent:\n  memory_limit: 7\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.agent.memory_limit, 7);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let path = PathBuf::from("/nonexistent/questloop.yml");
        assert!(Config::load(Some(&path)).is_err());
    }
}
