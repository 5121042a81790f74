//! QuestLoop - autonomous text adventure player
//!
//! CLI entry point: loads configuration, wires the components together and
//! runs one play session.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, FromArgMatches};
use eyre::{Context, Result};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use questloop::cli::{Cli, Command, PlayArgs, generate_after_help};
use questloop::config::Config;
use questloop::llm::create_client;
use questloop::progress::load_report;
use questloop::prompts::PromptSet;
use questloop::r#loop::TurnOrchestrator;
use questloop::transcript::WebDriverTranscript;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Logging isn't initialized yet, so nothing here can log
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("questloop")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("questloop.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cmd = Cli::command().after_help(generate_after_help());
    let cli = Cli::from_arg_matches(&cmd.get_matches())?;

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Some(Command::Report { path }) => cmd_report(&path),
        Some(Command::Play(args)) => cmd_play(cli.config.as_ref(), &args).await,
        None => cmd_play(cli.config.as_ref(), &PlayArgs::default()).await,
    }
}

async fn cmd_play(config_path: Option<&PathBuf>, args: &PlayArgs) -> Result<()> {
    let mut config = Config::load(config_path).context("Failed to load configuration")?;
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;
    info!(url = %config.game.url, model = %config.api.model, "Configuration loaded");

    let reasoner = create_client(&config.api).context("Failed to create reasoning client")?;
    let prompts = PromptSet::load(config.agent.prompts_dir.as_deref())?;
    let source = WebDriverTranscript::new(&config.game).context("Failed to create WebDriver client")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    spawn_signal_handler(shutdown_tx)?;

    let orchestrator = TurnOrchestrator::new(&config, Box::new(source), reasoner, prompts, shutdown_rx)?;
    println!("Playing {} (Ctrl+C to stop)...", config.game.url);
    let outcome = orchestrator.run().await?;

    println!("Session ended: {}", outcome.stop);
    println!("{}", serde_json::to_string_pretty(&outcome.report.meta)?);
    println!("Report saved to {}", config.report.path.display());

    if let questloop::r#loop::StopReason::Fatal(message) = outcome.stop {
        return Err(eyre::eyre!("Session aborted: {}", message));
    }
    Ok(())
}

fn cmd_report(path: &Path) -> Result<()> {
    let report = load_report(path)?;
    println!("{}", serde_json::to_string_pretty(&report.meta)?);
    println!("{} timeline entries", report.timeline.len());
    Ok(())
}

/// Feed SIGINT/SIGTERM (Ctrl+C elsewhere) into the shutdown channel
fn spawn_signal_handler(shutdown_tx: watch::Sender<bool>) -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::spawn(async move {
            tokio::select! {
                _ = sigint.recv() => warn!("SIGINT received"),
                _ = sigterm.recv() => warn!("SIGTERM received"),
            }
            let _ = shutdown_tx.send(true);
        });
    }

    #[cfg(not(unix))]
    {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Ctrl+C received");
                let _ = shutdown_tx.send(true);
            }
        });
    }

    Ok(())
}
