//! ReasoningClient - bounded-retry wrapper that never fails
//!
//! Every failure (transport, status, shape, timeout, empty answer) is logged
//! and retried up to `max_attempts`; after that the caller gets the empty
//! string, which the session treats as "no answer".

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::{LlmClient, LlmError, ReasoningRequest};
use crate::config::ApiConfig;

/// Default number of attempts per call
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default fixed delay between attempts
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Resilient front for the reasoning service
#[derive(Clone)]
pub struct ReasoningClient {
    transport: Arc<dyn LlmClient>,
    max_attempts: u32,
    retry_delay: Duration,
    attempt_timeout: Duration,
}

impl ReasoningClient {
    pub fn new(transport: Arc<dyn LlmClient>, max_attempts: u32, retry_delay: Duration, attempt_timeout: Duration) -> Self {
        debug!(max_attempts, ?retry_delay, ?attempt_timeout, "ReasoningClient::new: called");
        Self {
            transport,
            max_attempts: max_attempts.max(1),
            retry_delay,
            attempt_timeout,
        }
    }

    pub fn from_config(transport: Arc<dyn LlmClient>, config: &ApiConfig) -> Self {
        Self::new(
            transport,
            config.max_attempts,
            Duration::from_millis(config.retry_delay_ms),
            Duration::from_millis(config.timeout_ms),
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Ask for a single plain-text answer; returns "" when none could be obtained
    pub async fn call(&self, instruction: &str, context: &str) -> String {
        debug!(instruction_len = instruction.len(), context_len = context.len(), "call: called");
        let request = ReasoningRequest::new(instruction, context);

        for attempt in 1..=self.max_attempts {
            if attempt > 1 {
                warn!(attempt, delay_ms = self.retry_delay.as_millis() as u64, "call: retrying");
                tokio::time::sleep(self.retry_delay).await;
            }

            match self.attempt(&request).await {
                Ok(answer) => {
                    debug!(attempt, answer_len = answer.len(), "call: success");
                    return answer;
                }
                Err(e) => {
                    error!(attempt, max = self.max_attempts, error = %e, "Reasoning call failed");
                    if let Some(body) = e.body() {
                        error!(attempt, "Response body: {}", body);
                    }
                    if !e.is_retryable() {
                        debug!("call: error not retryable, giving up early");
                        break;
                    }
                }
            }
        }

        warn!(max = self.max_attempts, "call: attempts exhausted, returning empty answer");
        String::new()
    }

    async fn attempt(&self, request: &ReasoningRequest) -> Result<String, LlmError> {
        let reply = tokio::time::timeout(self.attempt_timeout, self.transport.respond(request))
            .await
            .map_err(|_| LlmError::Timeout(self.attempt_timeout))??;

        for trace in reply.traces() {
            match trace {
                Some(text) => info!("[REASONING]\n{}", text),
                None => info!("[REASONING] (content encrypted or hidden by provider)"),
            }
        }

        let answer = reply.answer();
        if answer.is_empty() {
            return Err(LlmError::invalid("response contained no message text"));
        }
        Ok(answer)
    }
}
