//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// QuestLoop - autonomous text adventure player
#[derive(Parser)]
#[command(
    name = "ql",
    about = "Plays browser-hosted text adventures with a reasoning model",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute (defaults to `play`)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Play a session until quit, turn limit or Ctrl+C
    Play(PlayArgs),

    /// Print the summary of a saved session report
    Report {
        /// Report file written by `play`
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
}

/// Overrides applied on top of the loaded configuration
#[derive(Debug, Clone, Default, clap::Args)]
pub struct PlayArgs {
    /// Game URL
    #[arg(long)]
    pub url: Option<String>,

    /// Run the browser without a window
    #[arg(long)]
    pub headless: bool,

    /// Stop after this many turns
    #[arg(short = 'n', long)]
    pub max_turns: Option<u32>,

    /// Where to write the session report
    #[arg(short, long)]
    pub report: Option<PathBuf>,

    /// Ask for a reflection before each command
    #[arg(long)]
    pub reflect: bool,

    /// Keep a goal list revised after every turn
    #[arg(long)]
    pub plan: bool,
}

impl PlayArgs {
    /// Fold the flags into `config`; flags only ever switch features on
    pub fn apply(&self, config: &mut crate::config::Config) {
        debug!(?self, "PlayArgs::apply: called");
        if let Some(url) = &self.url {
            config.game.url = url.clone();
        }
        if self.headless {
            config.game.headless = true;
        }
        if let Some(max) = self.max_turns {
            config.agent.max_turns = Some(max);
        }
        if let Some(report) = &self.report {
            config.report.path = report.clone();
        }
        if self.reflect {
            config.agent.use_reflection = true;
        }
        if self.plan {
            config.agent.use_planning = true;
        }
    }
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("questloop")
        .join("logs")
        .join("questloop.log")
}

/// Generate the after_help text
pub fn generate_after_help() -> String {
    format!(
        "Requires a running WebDriver (e.g. `chromedriver --port=9515`).\n\nLogs are written to: {}",
        get_log_path().display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_cli_parse_no_command() {
        let cli = Cli::parse_from(["ql"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_parse_play_flags() {
        let cli = Cli::parse_from(["ql", "play", "--headless", "-n", "25", "--reflect", "--plan", "--url", "http://x"]);
        let Some(Command::Play(args)) = cli.command else {
            panic!("expected play");
        };
        assert!(args.headless);
        assert!(args.reflect);
        assert!(args.plan);
        assert_eq!(args.max_turns, Some(25));
        assert_eq!(args.url.as_deref(), Some("http://x"));
    }

    #[test]
    fn test_cli_parse_report() {
        let cli = Cli::parse_from(["ql", "report", "out.json"]);
        assert!(matches!(cli.command, Some(Command::Report { path }) if path == PathBuf::from("out.json")));
    }

    #[test]
    fn test_cli_global_options_after_subcommand() {
        let cli = Cli::parse_from(["ql", "play", "-l", "debug", "-c", "my.yml"]);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.config, Some(PathBuf::from("my.yml")));
    }

    #[test]
    fn test_play_args_override_config() {
        let mut config = Config::default();
        let args = PlayArgs {
            url: Some("http://localhost/game".to_string()),
            headless: true,
            max_turns: Some(3),
            report: Some(PathBuf::from("runs/r.json")),
            reflect: false,
            plan: true,
        };
        args.apply(&mut config);

        assert_eq!(config.game.url, "http://localhost/game");
        assert!(config.game.headless);
        assert_eq!(config.agent.max_turns, Some(3));
        assert_eq!(config.report.path, PathBuf::from("runs/r.json"));
        assert!(!config.agent.use_reflection);
        assert!(config.agent.use_planning);
    }

    #[test]
    fn test_log_path_is_app_scoped() {
        assert!(get_log_path().ends_with("questloop/logs/questloop.log"));
    }
}
