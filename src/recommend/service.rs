//! The end-to-end recommendation pipeline.

use super::models::{ModelReply, RecommendationMode, RecommendationSet};
use super::profile::ProfileGatherer;
use super::prompt;
use super::rate_limit::RateLimiter;
use super::resolver::RecommendationResolver;
use super::store::{RecommendStore, HISTORY_LIMIT};
use super::{HistoryItem, RecommendError};
use crate::library_store::LibraryStore;
use crate::llm::{complete_json, CompletionOptions, LlmProvider};
use crate::streaming::StreamingApi;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Runs the full pipeline for one listener request:
/// rate-limit claim, profile gather, model completion, catalog resolution,
/// session persistence. Stages are strictly sequential; the two fan-outs
/// live inside the gather and resolve stages.
pub struct RecommendService {
    gatherer: ProfileGatherer,
    resolver: RecommendationResolver,
    llm: Option<Arc<dyn LlmProvider>>,
    store: Arc<dyn RecommendStore>,
    limiter: RateLimiter,
    completion_options: CompletionOptions,
}

impl RecommendService {
    /// `llm` is `None` when no generative backend is configured; every
    /// generation request then fails with [`RecommendError::NotConfigured`]
    /// while history reads keep working.
    pub fn new(
        streaming: Arc<dyn StreamingApi>,
        library: Arc<dyn LibraryStore>,
        llm: Option<Arc<dyn LlmProvider>>,
        store: Arc<dyn RecommendStore>,
        window: Duration,
    ) -> Self {
        Self {
            gatherer: ProfileGatherer::new(Arc::clone(&streaming), library),
            resolver: RecommendationResolver::new(streaming),
            llm,
            store,
            limiter: RateLimiter::new(window),
            completion_options: CompletionOptions::default(),
        }
    }

    /// Seconds the listener has to wait before the next generation run;
    /// zero means proceed.
    pub fn check_rate_limit(&self, user_id: i64) -> Result<u32, RecommendError> {
        let newest = self.store.latest_session_at(user_id)?;
        Ok(self.limiter.seconds_remaining(newest, Utc::now()))
    }

    /// Generates recommendations for a listener. `user_prompt` switches the
    /// run from smart mode to prompt mode.
    pub async fn recommend(
        &self,
        user_id: i64,
        access_token: &str,
        user_prompt: Option<String>,
    ) -> Result<RecommendationSet, RecommendError> {
        let llm = self.llm.as_ref().ok_or(RecommendError::NotConfigured)?;

        let newest = self.store.latest_session_at(user_id)?;
        let _claim = self
            .limiter
            .try_claim(user_id, newest, Utc::now())
            .map_err(|retry_after| RecommendError::RateLimited { retry_after })?;

        let mode = match user_prompt {
            Some(_) => RecommendationMode::Prompt,
            None => RecommendationMode::Smart,
        };
        info!(user_id, mode = mode.as_str(), "Starting recommendation run");

        let profile = self.gatherer.gather(user_id, access_token).await?;

        let system_prompt = prompt::build_system_prompt();
        let user_message = prompt::format_taste_profile(&profile, user_prompt.as_deref());
        let raw_reply =
            complete_json(llm.as_ref(), system_prompt, &user_message, &self.completion_options)
                .await?;
        debug!(user_id, reply = %raw_reply, "Model reply");

        let reply: ModelReply = serde_json::from_str(&raw_reply)
            .map_err(|e| RecommendError::MalformedReply(e.to_string()))?;

        let resolved = self
            .resolver
            .resolve_all(access_token, &reply.recommendations)
            .await;

        match self.store.save_session(
            user_id,
            mode,
            user_prompt.as_deref(),
            &reply.taste_summary,
            &resolved,
        ) {
            Ok(session_id) => debug!(user_id, session_id, "Recommendation session saved"),
            // The recommendations were already computed; still return them.
            Err(err) => warn!(user_id, error = %err, "Failed to save recommendation session"),
        }

        Ok(RecommendationSet {
            taste_summary: reply.taste_summary,
            recommendations: resolved,
            mode,
            user_prompt,
        })
    }

    pub fn history(&self, user_id: i64) -> Result<Vec<HistoryItem>, RecommendError> {
        Ok(self.store.history(user_id, HISTORY_LIMIT)?)
    }

    pub fn history_item(
        &self,
        user_id: i64,
        session_id: i64,
    ) -> Result<Option<HistoryItem>, RecommendError> {
        Ok(self.store.history_item(user_id, session_id)?)
    }
}
