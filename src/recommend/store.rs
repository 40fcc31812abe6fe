//! Persistence of completed recommendation sessions.

use super::models::{HistoryItem, RecommendationMode, ResolvedRecommendation};
use super::schema::RECOMMEND_VERSIONED_SCHEMAS;
use crate::sqlite_persistence::open_versioned_db;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// History listings are capped at this many sessions.
pub const HISTORY_LIMIT: usize = 20;

/// Trait for recommendation session storage backends.
pub trait RecommendStore: Send + Sync {
    /// Persists one completed session and returns its id.
    fn save_session(
        &self,
        user_id: i64,
        mode: RecommendationMode,
        user_prompt: Option<&str>,
        taste_summary: &str,
        recommendations: &[ResolvedRecommendation],
    ) -> Result<i64>;

    /// The listener's sessions, most recent first, capped at `limit`. An
    /// empty history is an empty list.
    fn history(&self, user_id: i64, limit: usize) -> Result<Vec<HistoryItem>>;

    /// A single session scoped to the listener; an id belonging to someone
    /// else behaves exactly like a nonexistent one.
    fn history_item(&self, user_id: i64, session_id: i64) -> Result<Option<HistoryItem>>;

    /// Creation time of the listener's newest session, for the rate-limit
    /// window.
    fn latest_session_at(&self, user_id: i64) -> Result<Option<DateTime<Utc>>>;
}

pub struct SqliteRecommendStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRecommendStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_versioned_db(db_path.as_ref(), RECOMMEND_VERSIONED_SCHEMAS)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn row_to_history_item(row: &rusqlite::Row) -> rusqlite::Result<(HistoryItem, String)> {
        let mode_str: String = row.get("mode")?;
        let created_at_str: String = row.get("created_at")?;
        let results_json: String = row.get("results_json")?;

        let item = HistoryItem {
            id: row.get("id")?,
            mode: RecommendationMode::parse(&mode_str).unwrap_or(RecommendationMode::Smart),
            user_prompt: row.get("user_prompt")?,
            taste_summary: row.get("taste_summary")?,
            recommendations: Vec::new(),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        };
        Ok((item, results_json))
    }
}

impl RecommendStore for SqliteRecommendStore {
    fn save_session(
        &self,
        user_id: i64,
        mode: RecommendationMode,
        user_prompt: Option<&str>,
        taste_summary: &str,
        recommendations: &[ResolvedRecommendation],
    ) -> Result<i64> {
        let results_json = serde_json::to_string(recommendations)
            .context("Failed to serialize recommendations")?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO recommendation_sessions
             (user_id, mode, user_prompt, taste_summary, results_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user_id,
                mode.as_str(),
                user_prompt,
                taste_summary,
                results_json,
                Utc::now().to_rfc3339(),
            ],
        )
        .context("Failed to insert recommendation session")?;
        Ok(conn.last_insert_rowid())
    }

    fn history(&self, user_id: i64, limit: usize) -> Result<Vec<HistoryItem>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, mode, user_prompt, taste_summary, results_json, created_at
             FROM recommendation_sessions
             WHERE user_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![user_id, limit as i64], Self::row_to_history_item)?;

        let mut items = Vec::new();
        for row in rows {
            let (mut item, results_json) = row?;
            item.recommendations = serde_json::from_str(&results_json).with_context(|| {
                format!("Failed to parse stored recommendations for session {}", item.id)
            })?;
            items.push(item);
        }
        Ok(items)
    }

    fn history_item(&self, user_id: i64, session_id: i64) -> Result<Option<HistoryItem>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT id, mode, user_prompt, taste_summary, results_json, created_at
                 FROM recommendation_sessions
                 WHERE id = ?1 AND user_id = ?2",
                params![session_id, user_id],
                Self::row_to_history_item,
            )
            .optional()?;

        match row {
            None => Ok(None),
            Some((mut item, results_json)) => {
                item.recommendations = serde_json::from_str(&results_json).with_context(|| {
                    format!("Failed to parse stored recommendations for session {}", item.id)
                })?;
                Ok(Some(item))
            }
        }
    }

    fn latest_session_at(&self, user_id: i64) -> Result<Option<DateTime<Utc>>> {
        let conn = self.conn.lock().unwrap();
        let created_at: Option<String> = conn
            .query_row(
                "SELECT created_at FROM recommendation_sessions
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, id DESC
                 LIMIT 1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(created_at
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc)))
    }
}
