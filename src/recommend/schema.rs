//! SQLite schema for the recommendation session database.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema};

// =============================================================================
// Version 1
// =============================================================================

/// One row per completed generation run; the resolved recommendation list is
/// stored as a JSON array in `results_json`.
const RECOMMENDATION_SESSIONS_TABLE_V1: Table = Table {
    name: "recommendation_sessions",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("user_id", &SqlType::Integer, non_null = true),
        sqlite_column!("mode", &SqlType::Text, non_null = true),
        sqlite_column!("user_prompt", &SqlType::Text),
        sqlite_column!("taste_summary", &SqlType::Text, non_null = true),
        sqlite_column!("results_json", &SqlType::Text, non_null = true),
        sqlite_column!("created_at", &SqlType::Text, non_null = true),
    ],
    indices: &[(
        "idx_recommendation_sessions_user_created",
        "user_id, created_at DESC",
    )],
    unique_constraints: &[],
};

pub const RECOMMEND_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 1,
    tables: &[RECOMMENDATION_SESSIONS_TABLE_V1],
    migration: None,
}];
