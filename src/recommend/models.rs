//! Data models for the recommendation pipeline.

use crate::library_store::{HourEntry, RatedEntry, ShelfEntry};
use chrono::{DateTime, Utc};
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

// =============================================================================
// Taste profile
// =============================================================================

/// A top artist with the genre tags the catalog attributes to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistEntry {
    pub name: String,
    pub genres: Vec<String>,
    /// Play count when the library has one for this artist, else 0.
    pub play_count: u32,
}

/// A top track with its combined artist credit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackEntry {
    pub name: String,
    pub artist: String,
}

/// A distinct recently played track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentEntry {
    pub name: String,
    pub artist: String,
}

/// Everything gathered about a listener's taste, built fresh per request and
/// owned by the request that built it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TasteProfile {
    pub top_artists: Vec<ArtistEntry>,
    pub top_tracks: Vec<TrackEntry>,
    pub recent_plays: Vec<RecentEntry>,
    pub highly_rated: Vec<RatedEntry>,
    pub on_rotation: Vec<ShelfEntry>,
    pub user_tags: Vec<String>,
    pub top_genres: Vec<String>,
    pub listening_hours: Vec<HourEntry>,
}

// =============================================================================
// Model reply
// =============================================================================

/// The angle a recommendation approaches the listener's taste from.
///
/// Off-vocabulary answers from the model are carried through as `Other`
/// rather than failing the parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryAngle {
    CrossGenre,
    DeepCut,
    EraBridge,
    MoodMatch,
    ArtistEvolution,
    Other(String),
}

impl DiscoveryAngle {
    pub fn as_str(&self) -> &str {
        match self {
            DiscoveryAngle::CrossGenre => "cross_genre",
            DiscoveryAngle::DeepCut => "deep_cut",
            DiscoveryAngle::EraBridge => "era_bridge",
            DiscoveryAngle::MoodMatch => "mood_match",
            DiscoveryAngle::ArtistEvolution => "artist_evolution",
            DiscoveryAngle::Other(s) => s,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "cross_genre" => DiscoveryAngle::CrossGenre,
            "deep_cut" => DiscoveryAngle::DeepCut,
            "era_bridge" => DiscoveryAngle::EraBridge,
            "mood_match" => DiscoveryAngle::MoodMatch,
            "artist_evolution" => DiscoveryAngle::ArtistEvolution,
            other => DiscoveryAngle::Other(other.to_string()),
        }
    }
}

impl Default for DiscoveryAngle {
    fn default() -> Self {
        DiscoveryAngle::Other(String::new())
    }
}

impl Serialize for DiscoveryAngle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DiscoveryAngle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(DiscoveryAngle::parse(&s))
    }
}

/// The reply shape the model is instructed to produce.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelReply {
    #[serde(default)]
    pub taste_summary: String,
    #[serde(default)]
    pub recommendations: Vec<RawRecommendation>,
}

/// A single recommendation as the model emitted it, before catalog
/// resolution.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRecommendation {
    /// "track", "album" or "artist"; anything else is treated as a track
    /// when building the search query.
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album: String,
    /// Models emit the release year as either a JSON number or a string;
    /// normalized to a string at parse time.
    #[serde(default, deserialize_with = "deserialize_year")]
    pub year: Option<String>,
    #[serde(default)]
    pub why: String,
    #[serde(default)]
    pub discovery_angle: DiscoveryAngle,
    #[serde(default)]
    pub mood_tags: Option<Vec<String>>,
}

impl RawRecommendation {
    /// The artist name to search with. Models sometimes put an artist-type
    /// recommendation's name in `title` and leave `artist` empty.
    pub fn artist_name(&self) -> &str {
        if !self.artist.is_empty() {
            return &self.artist;
        }
        if self.kind == "artist" {
            return &self.title;
        }
        ""
    }
}

fn deserialize_year<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

// =============================================================================
// Resolved output
// =============================================================================

/// A recommendation enriched with (or marked as lacking) a catalog match.
/// There is exactly one of these per raw recommendation, at the same index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRecommendation {
    #[serde(rename = "type")]
    pub kind: String,
    /// Empty when the item could not be resolved against the catalog.
    #[serde(default)]
    pub catalog_id: String,
    pub title: String,
    pub artist: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub album: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,
    pub why: String,
    #[serde(default)]
    pub discovery_angle: DiscoveryAngle,
    #[serde(default)]
    pub mood_tags: Vec<String>,
    pub resolved: bool,
}

/// How a session was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationMode {
    Smart,
    Prompt,
}

impl RecommendationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationMode::Smart => "smart",
            RecommendationMode::Prompt => "prompt",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "smart" => Some(RecommendationMode::Smart),
            "prompt" => Some(RecommendationMode::Prompt),
            _ => None,
        }
    }
}

/// The full payload returned for one generation run.
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationSet {
    pub taste_summary: String,
    pub recommendations: Vec<ResolvedRecommendation>,
    pub mode: RecommendationMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_prompt: Option<String>,
}

/// A persisted recommendation session, immutable once written.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryItem {
    pub id: i64,
    pub mode: RecommendationMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_prompt: Option<String>,
    pub taste_summary: String,
    pub recommendations: Vec<ResolvedRecommendation>,
    pub created_at: DateTime<Utc>,
}
