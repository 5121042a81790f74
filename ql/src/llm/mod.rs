//! Reasoning service client module
//!
//! Provides the transport trait, the HTTP implementation for a responses-style
//! endpoint, and the retrying `ReasoningClient` the session talks to.

use std::sync::Arc;

use tracing::debug;

pub mod client;
mod error;
mod reasoning;
mod responses;
mod types;

pub use client::LlmClient;
pub use error::LlmError;
pub use reasoning::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY, ReasoningClient};
pub use responses::ResponsesClient;
pub use types::{ContentPart, OutputItem, ReasoningOptions, ReasoningReply, ReasoningRequest, ResponsesBody};

use crate::config::ApiConfig;

/// Create the transport and wrap it in a ReasoningClient
pub fn create_client(config: &ApiConfig) -> Result<ReasoningClient, LlmError> {
    debug!(model = %config.model, "create_client: called");
    let transport: Arc<dyn LlmClient> = Arc::new(ResponsesClient::from_config(config)?);
    Ok(ReasoningClient::from_config(transport, config))
}
