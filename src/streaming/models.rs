//! Wire and domain models for the streaming catalog service.

use serde::Deserialize;

/// Time window for top-artists / top-tracks queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRange {
    Short,
    Medium,
    Long,
}

impl TimeRange {
    pub fn as_param(&self) -> &'static str {
        match self {
            TimeRange::Short => "short_term",
            TimeRange::Medium => "medium_term",
            TimeRange::Long => "long_term",
        }
    }
}

/// Entity kind for catalog search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    Track,
    Album,
    Artist,
}

impl SearchKind {
    pub fn as_param(&self) -> &'static str {
        match self {
            SearchKind::Track => "track",
            SearchKind::Album => "album",
            SearchKind::Artist => "artist",
        }
    }
}

/// An artist credit attached to a track.
#[derive(Debug, Clone, Deserialize)]
pub struct ArtistRef {
    pub name: String,
}

/// A top artist with the genre tags the service attributes to them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopArtist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
}

/// A top track with its artist credits.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopTrack {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
}

/// A single play event from the recently-played feed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayEvent {
    pub track: TopTrack,
    pub played_at: String,
}

/// One catalog search result, flattened to the fields the resolver needs.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: String,
    pub name: String,
    pub image_url: Option<String>,
    pub canonical_url: Option<String>,
}

// =============================================================================
// Response envelopes
// =============================================================================

#[derive(Debug, Deserialize)]
pub(super) struct ItemsPage<T> {
    #[serde(default)]
    pub items: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct ExternalUrls {
    pub canonical: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct SearchItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

#[derive(Debug, Deserialize)]
pub(super) struct Image {
    pub url: String,
}

/// Search responses are sectioned by kind; only the requested section is
/// populated.
#[derive(Debug, Deserialize)]
pub(super) struct SearchResponse {
    pub tracks: Option<ItemsPage<SearchItem>>,
    pub albums: Option<ItemsPage<SearchItem>>,
    pub artists: Option<ItemsPage<SearchItem>>,
}

impl SearchResponse {
    pub fn into_hits(self, kind: SearchKind) -> Vec<SearchHit> {
        let section = match kind {
            SearchKind::Track => self.tracks,
            SearchKind::Album => self.albums,
            SearchKind::Artist => self.artists,
        };
        section
            .map(|page| page.items)
            .unwrap_or_default()
            .into_iter()
            .map(|item| SearchHit {
                id: item.id,
                name: item.name,
                image_url: item.images.into_iter().next().map(|i| i.url),
                canonical_url: item.external_urls.canonical,
            })
            .collect()
    }
}
