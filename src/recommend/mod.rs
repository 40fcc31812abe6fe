//! The recommendation pipeline.
//!
//! One run is a strict sequence: rate-limit claim, 8-way profile gather,
//! prompt formatting, JSON-mode model completion, per-item catalog
//! resolution, session persistence. Each fan-out stage waits for all of its
//! tasks and tolerates partial failure; only the loss of every streaming
//! signal at once is fatal.

pub mod models;
mod profile;
mod prompt;
mod rate_limit;
mod resolver;
mod schema;
mod service;
mod store;

pub use models::{
    ArtistEntry, DiscoveryAngle, HistoryItem, ModelReply, RawRecommendation, RecentEntry,
    RecommendationMode, RecommendationSet, ResolvedRecommendation, TasteProfile, TrackEntry,
};
pub use profile::ProfileGatherer;
pub use prompt::{build_system_prompt, format_taste_profile};
pub use rate_limit::{RateLimitClaim, RateLimiter};
pub use resolver::RecommendationResolver;
pub use service::RecommendService;
pub use store::{RecommendStore, SqliteRecommendStore};

use crate::llm::LlmError;
use thiserror::Error;

/// Failures a pipeline run can end with. Everything else that can go wrong
/// inside a run (a single streaming source, a single search, the session
/// insert) is tolerated and logged instead.
#[derive(Debug, Error)]
pub enum RecommendError {
    /// No generative backend is configured.
    #[error("recommendations are not configured")]
    NotConfigured,

    /// Normal control-flow outcome of the per-user window, carried as an
    /// error variant so handlers can map it to a retry-after response.
    #[error("please wait {retry_after} seconds between recommendations")]
    RateLimited { retry_after: u32 },

    /// All four streaming catalog fetches failed; there is no listening
    /// signal to build a profile from.
    #[error("all streaming catalog calls failed; cannot build a taste profile")]
    NoListeningSignal,

    /// The model provider failed; `LlmError::RateLimited` inside means the
    /// run was rate-limited twice and the caller should suggest retrying
    /// shortly.
    #[error("model provider error: {0}")]
    Generation(#[from] LlmError),

    /// The model produced valid JSON that does not match the reply contract.
    #[error("model reply did not match the expected shape: {0}")]
    MalformedReply(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}
