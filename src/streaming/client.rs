//! Reqwest-backed implementation of [`StreamingApi`].

use super::models::{
    ItemsPage, PlayEvent, SearchHit, SearchKind, SearchResponse, TimeRange, TopArtist, TopTrack,
};
use super::{StreamingApi, StreamingError};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the streaming catalog API.
pub struct StreamingClient {
    client: Client,
    base_url: String,
}

impl StreamingClient {
    /// # Arguments
    /// * `base_url` - Base URL of the catalog API, without a trailing slash.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        access_token: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, StreamingError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(path = %path, "Requesting streaming catalog API");

        let response = self
            .client
            .get(&url)
            .query(query)
            .bearer_auth(access_token)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    StreamingError::Timeout
                } else {
                    StreamingError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StreamingError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        response.json().await.map_err(|e| {
            StreamingError::InvalidResponse(format!("Failed to parse {} response: {}", path, e))
        })
    }
}

#[async_trait]
impl StreamingApi for StreamingClient {
    async fn top_artists(
        &self,
        access_token: &str,
        range: TimeRange,
        limit: usize,
    ) -> Result<Vec<TopArtist>, StreamingError> {
        let page: ItemsPage<TopArtist> = self
            .get_json(
                access_token,
                "/me/top/artists",
                &[
                    ("time_range", range.as_param().to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        Ok(page.items)
    }

    async fn top_tracks(
        &self,
        access_token: &str,
        range: TimeRange,
        limit: usize,
    ) -> Result<Vec<TopTrack>, StreamingError> {
        let page: ItemsPage<TopTrack> = self
            .get_json(
                access_token,
                "/me/top/tracks",
                &[
                    ("time_range", range.as_param().to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        Ok(page.items)
    }

    async fn recently_played(&self, access_token: &str) -> Result<Vec<PlayEvent>, StreamingError> {
        let page: ItemsPage<PlayEvent> = self
            .get_json(
                access_token,
                "/me/player/recently-played",
                &[("limit", "50".to_string())],
            )
            .await?;
        Ok(page.items)
    }

    async fn search(
        &self,
        access_token: &str,
        query: &str,
        kind: SearchKind,
        limit: usize,
    ) -> Result<Vec<SearchHit>, StreamingError> {
        let response: SearchResponse = self
            .get_json(
                access_token,
                "/search",
                &[
                    ("q", query.to_string()),
                    ("type", kind.as_param().to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        Ok(response.into_hits(kind))
    }
}
