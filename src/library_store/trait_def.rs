//! LibraryStore trait definition.

use super::models::{EntityKind, HourEntry, RatedEntry, ShelfEntry, ShelfStatus};
use anyhow::Result;
use chrono::{DateTime, Utc};

/// Trait for library storage backends.
///
/// All read queries are scoped by user id and return empty collections, not
/// errors, when nothing matches.
pub trait LibraryStore: Send + Sync {
    // =========================================================================
    // Profile reads
    // =========================================================================

    /// Entities rated at or above `min_score`, highest score first,
    /// capped at `limit`.
    fn highly_rated(&self, user_id: i64, min_score: u8, limit: usize) -> Result<Vec<RatedEntry>>;

    /// Entities currently on the on-rotation shelf, capped at `limit`.
    fn on_rotation(&self, user_id: i64, limit: usize) -> Result<Vec<ShelfEntry>>;

    /// All of the listener's tag names, alphabetical.
    fn tag_names(&self, user_id: i64) -> Result<Vec<String>>;

    /// The listener's most active hours of the day, highest play count
    /// first, capped at `limit`.
    fn listening_hours(&self, user_id: i64, limit: usize) -> Result<Vec<HourEntry>>;

    // =========================================================================
    // Writes (used by the CRUD layer above this crate)
    // =========================================================================

    /// Insert or replace a rating for an entity. Scores are 1-10.
    fn upsert_rating(&self, user_id: i64, kind: EntityKind, entity_id: &str, score: u8)
        -> Result<()>;

    /// Place an entity on a shelf, replacing any previous status.
    fn set_shelf_status(
        &self,
        user_id: i64,
        kind: EntityKind,
        entity_id: &str,
        status: ShelfStatus,
    ) -> Result<()>;

    /// Add a tag name; adding an existing name is a no-op.
    fn add_tag(&self, user_id: i64, name: &str) -> Result<()>;

    /// Record a single play event.
    fn record_play(&self, user_id: i64, track_id: &str, played_at: DateTime<Utc>) -> Result<()>;

    /// Insert or replace display metadata for an entity.
    fn upsert_entity_metadata(
        &self,
        kind: EntityKind,
        entity_id: &str,
        name: Option<&str>,
        extra_json: Option<&str>,
    ) -> Result<()>;
}
