//! SQLite schema for the library database.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema, DEFAULT_CREATED_AT};

// =============================================================================
// Version 1
// =============================================================================

/// Ratings given by a listener to tracks, albums and artists (1-10).
const RATINGS_TABLE_V1: Table = Table {
    name: "ratings",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("user_id", &SqlType::Integer, non_null = true),
        sqlite_column!("entity_type", &SqlType::Text, non_null = true),
        sqlite_column!("entity_id", &SqlType::Text, non_null = true),
        sqlite_column!("score", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Text,
            non_null = true,
            default_value = Some(DEFAULT_CREATED_AT)
        ),
    ],
    indices: &[("idx_ratings_user_score", "user_id, score DESC")],
    unique_constraints: &[&["user_id", "entity_type", "entity_id"]],
};

/// Shelf placement per entity (on_rotation / want_to_listen / listened).
const SHELVES_TABLE_V1: Table = Table {
    name: "shelves",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("user_id", &SqlType::Integer, non_null = true),
        sqlite_column!("entity_type", &SqlType::Text, non_null = true),
        sqlite_column!("entity_id", &SqlType::Text, non_null = true),
        sqlite_column!("status", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Text,
            non_null = true,
            default_value = Some(DEFAULT_CREATED_AT)
        ),
    ],
    indices: &[("idx_shelves_user_status", "user_id, status")],
    unique_constraints: &[&["user_id", "entity_type", "entity_id"]],
};

/// Free-form tag names a listener applies to their library.
const TAGS_TABLE_V1: Table = Table {
    name: "tags",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("user_id", &SqlType::Integer, non_null = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_tags_user", "user_id")],
    unique_constraints: &[&["user_id", "name"]],
};

/// Raw play events, one row per play, used for the hour histogram.
const LISTENING_HISTORY_TABLE_V1: Table = Table {
    name: "listening_history",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("user_id", &SqlType::Integer, non_null = true),
        sqlite_column!("track_id", &SqlType::Text, non_null = true),
        sqlite_column!("played_at", &SqlType::Text, non_null = true),
    ],
    indices: &[(
        "idx_listening_history_user_played",
        "user_id, played_at DESC",
    )],
    unique_constraints: &[],
};

/// Display metadata per entity; `extra_json` carries a free-form blob
/// (e.g. `{"artist_name": ...}`) written by whatever synced the entity.
const ENTITY_METADATA_TABLE_V1: Table = Table {
    name: "entity_metadata",
    columns: &[
        sqlite_column!("entity_type", &SqlType::Text, non_null = true),
        sqlite_column!("entity_id", &SqlType::Text, non_null = true),
        sqlite_column!("name", &SqlType::Text),
        sqlite_column!("extra_json", &SqlType::Text),
    ],
    indices: &[],
    unique_constraints: &[&["entity_type", "entity_id"]],
};

pub const LIBRARY_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 1,
    tables: &[
        RATINGS_TABLE_V1,
        SHELVES_TABLE_V1,
        TAGS_TABLE_V1,
        LISTENING_HISTORY_TABLE_V1,
        ENTITY_METADATA_TABLE_V1,
    ],
    migration: None,
}];
