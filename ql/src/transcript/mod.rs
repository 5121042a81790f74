//! TranscriptSource - the rendered interactive surface
//!
//! The session needs five capabilities from the surface: load it, read the
//! transcript markup, read the status line, submit a command, shut down.
//! [`WebDriverTranscript`] provides them for a browser-hosted game.

use async_trait::async_trait;
use thiserror::Error;

mod webdriver;

pub use webdriver::WebDriverTranscript;

/// Errors from the interactive surface
#[derive(Debug, Error)]
pub enum TranscriptError {
    /// Required element did not appear within the bounded wait
    #[error("Element '{selector}' not ready after {waited_ms}ms")]
    NotReady { selector: String, waited_ms: u64 },

    /// Element lookup failed outright
    #[error("Element '{0}' not found")]
    MissingElement(String),

    /// The browser session is gone; nothing further can succeed
    #[error("Session lost: {0}")]
    SessionLost(String),

    #[error("WebDriver error {status}: {message}")]
    Protocol { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl TranscriptError {
    /// Fatal errors end the session; everything else degrades the turn
    pub fn is_fatal(&self) -> bool {
        matches!(self, TranscriptError::SessionLost(_))
    }
}

/// Capabilities the turn loop needs from the rendered surface
#[async_trait]
pub trait TranscriptSource: Send {
    /// Navigate and wait for the initial ready marker
    async fn start(&mut self) -> Result<(), TranscriptError>;

    /// Full markup of the transcript container (bounded wait)
    async fn transcript_markup(&mut self) -> Result<String, TranscriptError>;

    /// Status line text; `Ok(None)` when the surface shows no status area
    async fn status_line(&mut self) -> Result<Option<String>, TranscriptError>;

    /// Best-effort submit followed by the settle wait
    async fn send_command(&mut self, command: &str) -> Result<(), TranscriptError>;

    /// Release the surface
    async fn close(&mut self) -> Result<(), TranscriptError>;
}
