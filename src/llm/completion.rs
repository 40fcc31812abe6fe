//! JSON-mode completion with the pipeline's two retry policies.

use super::provider::{CompletionOptions, LlmError, LlmProvider};
use super::types::Message;
use std::time::Duration;
use tracing::{info, warn};

/// Backoff used when the provider rate-limits without suggesting one.
const DEFAULT_RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(5);

/// Provider-suggested backoffs above this are treated as unusable.
const MAX_RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(60);

const CORRECTION_MESSAGE: &str =
    "Your previous response was not valid JSON. Please respond with ONLY a valid JSON object.";

/// Requests a JSON-object completion and enforces the reply contract:
///
/// - a 429 from the provider is retried exactly once, after the suggested
///   backoff when it is sane, otherwise a default one; a second 429 is fatal
///   and surfaces as [`LlmError::RateLimited`] so callers can answer
///   "try again shortly";
/// - a reply that is not valid JSON is retried exactly once with a corrective
///   follow-up message; a second invalid reply is fatal.
pub async fn complete_json(
    provider: &dyn LlmProvider,
    system: &str,
    user_message: &str,
    options: &CompletionOptions,
) -> Result<String, LlmError> {
    let options = CompletionOptions {
        json_mode: true,
        ..options.clone()
    };

    let mut messages = Vec::new();
    if !system.is_empty() {
        messages.push(Message::system(system));
    }
    messages.push(Message::user(user_message));

    let text = complete_with_rate_limit_retry(provider, &messages, &options).await?;
    if is_valid_json(&text) {
        return Ok(text);
    }

    warn!(
        model = %provider.model(),
        "Model reply was not valid JSON, sending corrective follow-up"
    );
    messages.push(Message::assistant(text));
    messages.push(Message::user(CORRECTION_MESSAGE));

    let text = complete_with_rate_limit_retry(provider, &messages, &options).await?;
    if !is_valid_json(&text) {
        return Err(LlmError::InvalidResponse(
            "Model reply is not valid JSON after corrective retry".to_string(),
        ));
    }
    Ok(text)
}

async fn complete_with_rate_limit_retry(
    provider: &dyn LlmProvider,
    messages: &[Message],
    options: &CompletionOptions,
) -> Result<String, LlmError> {
    match provider.complete(messages, options).await {
        Err(LlmError::RateLimited { retry_after }) => {
            let backoff = match retry_after {
                Some(suggested) if suggested <= MAX_RATE_LIMIT_BACKOFF => suggested,
                _ => DEFAULT_RATE_LIMIT_BACKOFF,
            };
            info!(
                model = %provider.model(),
                backoff_ms = backoff.as_millis() as u64,
                "Model provider rate limited, retrying once"
            );
            tokio::time::sleep(backoff).await;
            provider.complete(messages, options).await
        }
        other => other,
    }
}

fn is_valid_json(text: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(text).is_ok()
}
