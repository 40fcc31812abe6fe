//! Data models for the library database.

use serde::{Deserialize, Serialize};

/// The kind of catalog entity a rating, shelf entry or metadata row refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Track,
    Album,
    Artist,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Track => "track",
            EntityKind::Album => "album",
            EntityKind::Artist => "artist",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "track" => Some(EntityKind::Track),
            "album" => Some(EntityKind::Album),
            "artist" => Some(EntityKind::Artist),
            _ => None,
        }
    }
}

/// Where an entity sits on the listener's shelf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShelfStatus {
    OnRotation,
    WantToListen,
    Listened,
}

impl ShelfStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShelfStatus::OnRotation => "on_rotation",
            ShelfStatus::WantToListen => "want_to_listen",
            ShelfStatus::Listened => "listened",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "on_rotation" => Some(ShelfStatus::OnRotation),
            "want_to_listen" => Some(ShelfStatus::WantToListen),
            "listened" => Some(ShelfStatus::Listened),
            _ => None,
        }
    }
}

/// A highly rated entity, labeled from the metadata side channel.
///
/// `artist` is resolved from the entity's `extra_json` blob for tracks and
/// albums; it stays empty when the blob is missing or unparseable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatedEntry {
    pub kind: EntityKind,
    pub name: String,
    pub artist: String,
    pub score: u8,
}

/// An entity on the listener's on-rotation shelf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShelfEntry {
    pub kind: EntityKind,
    pub name: String,
    pub artist: String,
}

/// Listening activity for one hour of the day (0-23).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourEntry {
    pub hour: u8,
    pub count: u32,
}
