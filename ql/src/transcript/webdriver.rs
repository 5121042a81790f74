//! WebDriverTranscript - TranscriptSource over the W3C WebDriver protocol
//!
//! Talks JSON over HTTP to a running driver (chromedriver by default). Every
//! element wait is a bounded poll; a vanished session or an unreachable driver
//! is reported as `SessionLost` so the loop can finalize instead of spinning.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::{TranscriptError, TranscriptSource};
use crate::config::GameConfig;

/// W3C key under which element references are returned
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// WebDriver code point for the Enter key
const ENTER_KEY: char = '\u{E007}';

const POLL_INTERVAL: Duration = Duration::from_millis(250);

const OUTER_HTML_SCRIPT: &str = "const el = document.querySelector(arguments[0]); return el ? el.outerHTML : null;";

const INNER_TEXT_SCRIPT: &str = "const el = document.querySelector(arguments[0]); return el ? el.innerText : null;";

/// Browser-backed transcript source
pub struct WebDriverTranscript {
    http: Client,
    driver_url: String,
    session_id: Option<String>,
    config: GameConfig,
}

impl WebDriverTranscript {
    pub fn new(config: &GameConfig) -> Result<Self, TranscriptError> {
        debug!(driver = %config.webdriver_url, url = %config.url, "WebDriverTranscript::new: called");
        let http = Client::builder()
            .timeout(Duration::from_millis(config.ready_timeout_ms.max(1_000) * 3))
            .build()?;
        Ok(Self {
            http,
            driver_url: config.webdriver_url.trim_end_matches('/').to_string(),
            session_id: None,
            config: config.clone(),
        })
    }

    fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.config.ready_timeout_ms)
    }

    fn session_path(&self, suffix: &str) -> Result<String, TranscriptError> {
        let id = self
            .session_id
            .as_ref()
            .ok_or_else(|| TranscriptError::SessionLost("no active session".to_string()))?;
        Ok(format!("/session/{}{}", id, suffix))
    }

    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, TranscriptError> {
        debug!(%method, %path, "command: called");
        let url = format!("{}{}", self.driver_url, path);
        let mut request = self.http.request(method.clone(), url);
        if method == Method::POST {
            request = request.json(&body.unwrap_or_else(|| json!({})));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_connect() {
                TranscriptError::SessionLost(format!("driver unreachable: {}", e))
            } else {
                TranscriptError::Network(e)
            }
        })?;

        let status = response.status().as_u16();
        let payload: Value = response.json().await.unwrap_or(Value::Null);
        if !(200..300).contains(&status) {
            return Err(classify_error(status, &payload));
        }
        Ok(payload.get("value").cloned().unwrap_or(Value::Null))
    }

    async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value, TranscriptError> {
        let path = self.session_path("/execute/sync")?;
        self.command(Method::POST, &path, Some(json!({ "script": script, "args": args })))
            .await
    }

    /// Poll `script(selector)` until it yields a non-null value or the wait runs out
    async fn wait_for(&self, script: &str, selector: &str) -> Result<Value, TranscriptError> {
        let started = Instant::now();
        loop {
            let value = self.execute(script, vec![json!(selector)]).await?;
            if !value.is_null() {
                return Ok(value);
            }
            if started.elapsed() >= self.ready_timeout() {
                return Err(TranscriptError::NotReady {
                    selector: selector.to_string(),
                    waited_ms: started.elapsed().as_millis() as u64,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn find_element(&self, selector: &str) -> Result<String, TranscriptError> {
        let path = self.session_path("/element")?;
        let value = self
            .command(
                Method::POST,
                &path,
                Some(json!({ "using": "css selector", "value": selector })),
            )
            .await
            .map_err(|e| match e {
                TranscriptError::Protocol { status: 404, .. } => TranscriptError::MissingElement(selector.to_string()),
                other => other,
            })?;
        element_id(&value).ok_or_else(|| TranscriptError::MissingElement(selector.to_string()))
    }
}

/// Session capabilities for a (possibly headless) Chrome
pub(crate) fn capabilities(headless: bool) -> Value {
    let mut args = vec!["--disable-gpu", "--window-size=1280,1024"];
    if headless {
        args.push("--headless=new");
    }
    json!({
        "capabilities": {
            "alwaysMatch": {
                "browserName": "chrome",
                "goog:chromeOptions": { "args": args }
            }
        }
    })
}

/// Map a WebDriver error payload onto TranscriptError
pub(crate) fn classify_error(status: u16, payload: &Value) -> TranscriptError {
    let value = payload.get("value");
    let code = value.and_then(|v| v.get("error")).and_then(Value::as_str).unwrap_or("unknown error");
    let message = value
        .and_then(|v| v.get("message"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    match code {
        "invalid session id" | "no such window" | "session not created" => {
            TranscriptError::SessionLost(format!("{}: {}", code, message))
        }
        _ => TranscriptError::Protocol {
            status,
            message: format!("{}: {}", code, message),
        },
    }
}

fn element_id(value: &Value) -> Option<String> {
    value.get(ELEMENT_KEY).and_then(Value::as_str).map(str::to_string)
}

#[async_trait]
impl TranscriptSource for WebDriverTranscript {
    async fn start(&mut self) -> Result<(), TranscriptError> {
        info!("Opening {}", self.config.url);
        let value = self
            .command(Method::POST, "/session", Some(capabilities(self.config.headless)))
            .await?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| TranscriptError::SessionLost("driver returned no session id".to_string()))?;
        debug!(%session_id, "start: session created");
        self.session_id = Some(session_id.to_string());

        let path = self.session_path("/url")?;
        self.command(Method::POST, &path, Some(json!({ "url": self.config.url })))
            .await?;

        self.wait_for(OUTER_HTML_SCRIPT, &self.config.ready_selector).await?;
        info!("Game surface ready");
        Ok(())
    }

    async fn transcript_markup(&mut self) -> Result<String, TranscriptError> {
        let value = self.wait_for(OUTER_HTML_SCRIPT, &self.config.content_selector).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn status_line(&mut self) -> Result<Option<String>, TranscriptError> {
        let value = self
            .execute(INNER_TEXT_SCRIPT, vec![json!(self.config.status_selector)])
            .await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn send_command(&mut self, command: &str) -> Result<(), TranscriptError> {
        debug!(%command, "send_command: called");
        let element = self.find_element(&self.config.input_selector).await?;

        let clear = self.session_path(&format!("/element/{}/clear", element))?;
        self.command(Method::POST, &clear, None).await?;

        let value = self.session_path(&format!("/element/{}/value", element))?;
        let text = format!("{}{}", command, ENTER_KEY);
        self.command(Method::POST, &value, Some(json!({ "text": text }))).await?;

        tokio::time::sleep(Duration::from_millis(self.config.settle_ms)).await;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TranscriptError> {
        let Some(id) = self.session_id.take() else {
            debug!("close: no session to close");
            return Ok(());
        };
        info!("Closing browser session");
        if let Err(e) = self.command(Method::DELETE, &format!("/session/{}", id), None).await {
            warn!(error = %e, "close: failed to delete session");
            return Err(e);
        }
        Ok(())
    }
}
