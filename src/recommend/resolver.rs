//! Catalog resolution of generated recommendations.
//!
//! One concurrent search per item; output order always matches input order
//! and a failed or empty search keeps the item with `resolved = false`
//! instead of dropping it.

use super::models::{RawRecommendation, ResolvedRecommendation};
use crate::streaming::{SearchKind, StreamingApi};
use futures::future::join_all;
use std::sync::Arc;
use tracing::warn;

pub struct RecommendationResolver {
    streaming: Arc<dyn StreamingApi>,
}

impl RecommendationResolver {
    pub fn new(streaming: Arc<dyn StreamingApi>) -> Self {
        Self { streaming }
    }

    /// Resolves every recommendation against the catalog search API.
    /// Guarantee: output length equals input length and `output[i]`
    /// corresponds to `input[i]`, regardless of completion order or
    /// individual failures.
    pub async fn resolve_all(
        &self,
        access_token: &str,
        recommendations: &[RawRecommendation],
    ) -> Vec<ResolvedRecommendation> {
        join_all(
            recommendations
                .iter()
                .map(|rec| self.resolve_one(access_token, rec)),
        )
        .await
    }

    async fn resolve_one(
        &self,
        access_token: &str,
        rec: &RawRecommendation,
    ) -> ResolvedRecommendation {
        let artist = rec.artist_name().to_string();
        let (query, kind) = match rec.kind.as_str() {
            "track" => (format!("{} {}", rec.title, artist), SearchKind::Track),
            "album" => (format!("{} {}", rec.title, artist), SearchKind::Album),
            "artist" => (artist.clone(), SearchKind::Artist),
            // Unknown kinds get a track-style lookup.
            _ => (format!("{} {}", rec.title, artist), SearchKind::Track),
        };

        let mut resolved = ResolvedRecommendation {
            kind: rec.kind.clone(),
            catalog_id: String::new(),
            title: rec.title.clone(),
            artist,
            album: rec.album.clone(),
            year: rec.year.clone(),
            image_url: None,
            external_url: None,
            why: rec.why.clone(),
            discovery_angle: rec.discovery_angle.clone(),
            mood_tags: rec.mood_tags.clone().unwrap_or_default(),
            resolved: false,
        };

        match self.streaming.search(access_token, &query, kind, 1).await {
            Ok(hits) => {
                if let Some(hit) = hits.into_iter().next() {
                    resolved.catalog_id = hit.id;
                    resolved.image_url = hit.image_url;
                    resolved.external_url = hit.canonical_url;
                    resolved.resolved = true;
                }
            }
            Err(err) => {
                warn!(query = %query, error = %err, "resolve: search failed, keeping item unresolved");
            }
        }

        resolved
    }
}
