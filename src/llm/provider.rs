//! Model provider trait definition.

use super::types::Message;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Options for a completion request.
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    /// Temperature for sampling (0.0 = deterministic, 1.0 = creative).
    pub temperature: f32,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
    /// Request timeout.
    pub timeout: Duration,
    /// Ask the provider to constrain output to a JSON object.
    pub json_mode: bool,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.9,
            max_tokens: Some(4096),
            timeout: Duration::from_secs(60),
            json_mode: false,
        }
    }
}

/// Errors that can occur when interacting with a model provider.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The provider answered 429. `retry_after` carries the provider's
    /// suggested backoff when one was sent.
    #[error("Rate limited")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Request timeout")]
    Timeout,
}

/// Trait for chat-completion providers.
///
/// Implementations connect to different backends (OpenAI-compatible APIs,
/// local runtimes, test stubs) behind a unified interface. `complete`
/// returns the assistant's raw text; retry policies live above this trait.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// The provider's name (e.g. "openai").
    fn name(&self) -> &str;

    /// The model being used.
    fn model(&self) -> &str;

    /// Complete a conversation and return the assistant's text.
    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<String, LlmError>;
}
