//! LlmClient trait definition

use async_trait::async_trait;

use super::{LlmError, ReasoningReply, ReasoningRequest};

/// Stateless transport to the reasoning service - one attempt per call
///
/// Implementors perform exactly one network exchange and report every failure
/// as an `LlmError`. Retry, timeout budgeting and the empty-answer sentinel
/// live one layer up in `ReasoningClient`.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single request and return the parsed reply
    async fn respond(&self, request: &ReasoningRequest) -> Result<ReasoningReply, LlmError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing::debug;

    use crate::llm::{ContentPart, OutputItem};

    /// Mock LLM client for unit tests
    ///
    /// Replays scripted outcomes in order; once exhausted every call fails.
    pub struct MockLlmClient {
        outcomes: Mutex<VecDeque<Result<ReasoningReply, LlmError>>>,
        requests: Mutex<Vec<ReasoningRequest>>,
        call_count: AtomicUsize,
    }

    impl MockLlmClient {
        pub fn new(outcomes: Vec<Result<ReasoningReply, LlmError>>) -> Self {
            debug!(outcome_count = %outcomes.len(), "MockLlmClient::new: called");
            Self {
                outcomes: Mutex::new(outcomes.into()),
                requests: Mutex::new(Vec::new()),
                call_count: AtomicUsize::new(0),
            }
        }

        /// Convenience: every scripted outcome is a successful text answer
        pub fn with_answers(answers: &[&str]) -> Self {
            Self::new(answers.iter().map(|a| Ok(text_reply(a))).collect())
        }

        /// A client whose every call fails at the transport level
        pub fn failing() -> Self {
            Self::new(vec![])
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        pub fn requests(&self) -> Vec<ReasoningRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    /// Build a reply carrying one message item with `text`
    pub fn text_reply(text: &str) -> ReasoningReply {
        ReasoningReply {
            output: vec![OutputItem::Message {
                content: vec![ContentPart::OutputText { text: text.to_string() }],
            }],
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn respond(&self, request: &ReasoningRequest) -> Result<ReasoningReply, LlmError> {
            debug!("MockLlmClient::respond: called");
            self.call_count.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());
            self.outcomes.lock().unwrap().pop_front().unwrap_or_else(|| {
                debug!("MockLlmClient::respond: no more mock outcomes");
                Err(LlmError::ApiError {
                    status: 503,
                    message: "No more mock responses".to_string(),
                })
            })
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_client_returns_outcomes_in_order() {
            let client = MockLlmClient::with_answers(&["north", "look"]);
            let req = ReasoningRequest::new("Test", "ctx");

            assert_eq!(client.respond(&req).await.unwrap().answer(), "north");
            assert_eq!(client.respond(&req).await.unwrap().answer(), "look");
            assert_eq!(client.call_count(), 2);
            assert_eq!(client.requests()[0], req);
        }

        #[tokio::test]
        async fn test_mock_client_errors_when_exhausted() {
            let client = MockLlmClient::failing();
            let result = client.respond(&ReasoningRequest::new("Test", "ctx")).await;
            assert!(result.is_err());
        }
    }
}
