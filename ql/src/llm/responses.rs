//! Responses-endpoint HTTP client
//!
//! Implements the LlmClient trait against an OpenAI-compatible `/responses`
//! endpoint (OpenRouter by default). One call is one HTTP exchange; the
//! per-request timeout bounds how long a hung connection can stall a turn.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::{LlmClient, LlmError, ReasoningOptions, ReasoningReply, ReasoningRequest, ResponsesBody};
use crate::config::ApiConfig;

/// HTTP client for the responses endpoint
pub struct ResponsesClient {
    model: String,
    effort: String,
    api_key: String,
    base_url: String,
    http: Client,
    timeout: Duration,
}

impl ResponsesClient {
    /// Create a new client from the api section of the config
    pub fn from_config(config: &ApiConfig) -> Result<Self, LlmError> {
        debug!(model = %config.model, base_url = %config.base_url, "from_config: called");
        let api_key = config.resolve_key().map_err(|e| LlmError::Config(e.to_string()))?;

        let timeout = Duration::from_millis(config.timeout_ms);
        let http = Client::builder().timeout(timeout).build().map_err(LlmError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            effort: config.reasoning_effort.clone(),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            timeout,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/responses", self.base_url)
    }

    fn build_body<'a>(&'a self, request: &'a ReasoningRequest) -> ResponsesBody<'a> {
        ResponsesBody {
            model: &self.model,
            reasoning: ReasoningOptions { effort: &self.effort },
            instructions: &request.instructions,
            input: &request.input,
        }
    }
}

/// Parse a raw body, keeping the text around for diagnostics on failure
pub(crate) fn parse_reply(text: &str) -> Result<ReasoningReply, LlmError> {
    serde_json::from_str::<ReasoningReply>(text).map_err(|e| LlmError::InvalidResponse {
        message: e.to_string(),
        body: Some(text.to_string()),
    })
}

#[async_trait]
impl LlmClient for ResponsesClient {
    async fn respond(&self, request: &ReasoningRequest) -> Result<ReasoningReply, LlmError> {
        debug!(%self.model, input_len = request.input.len(), "respond: called");
        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(&self.build_body(request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(self.timeout)
                } else {
                    LlmError::Network(e)
                }
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout(self.timeout)
            } else {
                LlmError::Network(e)
            }
        })?;

        if !status.is_success() {
            debug!(status = status.as_u16(), "respond: API error");
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                message: text,
            });
        }

        debug!("respond: success");
        parse_reply(&text)
    }
}
