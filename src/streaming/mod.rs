//! Client for the streaming catalog service the listener's account lives on.
//!
//! Covers the four listening-signal reads the profile gatherer fans out to
//! (top artists, top tracks, recently played) plus the search endpoint the
//! recommendation resolver matches generated items against. Every call takes
//! the listener's access token; obtaining and refreshing that token is the
//! job of the identity layer in front of this crate.

mod client;
mod models;

pub use client::StreamingClient;
pub use models::{ArtistRef, PlayEvent, SearchHit, SearchKind, TimeRange, TopArtist, TopTrack};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the streaming catalog service. The profile gatherer treats
/// every variant the same way (source unavailable); the distinction exists
/// for logs.
#[derive(Debug, Error)]
pub enum StreamingError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request timeout")]
    Timeout,

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Trait for the streaming catalog service.
#[async_trait]
pub trait StreamingApi: Send + Sync {
    /// The listener's top artists over the given time window, service order.
    async fn top_artists(
        &self,
        access_token: &str,
        range: TimeRange,
        limit: usize,
    ) -> Result<Vec<TopArtist>, StreamingError>;

    /// The listener's top tracks over the given time window, service order.
    async fn top_tracks(
        &self,
        access_token: &str,
        range: TimeRange,
        limit: usize,
    ) -> Result<Vec<TopTrack>, StreamingError>;

    /// The listener's most recent play events, newest first, up to 50.
    async fn recently_played(&self, access_token: &str) -> Result<Vec<PlayEvent>, StreamingError>;

    /// Catalog search for a single kind of entity, best matches first.
    async fn search(
        &self,
        access_token: &str,
        query: &str,
        kind: SearchKind,
        limit: usize,
    ) -> Result<Vec<SearchHit>, StreamingError>;
}
