use super::models::{EntityKind, HourEntry, RatedEntry, ShelfEntry, ShelfStatus};
use super::schema::LIBRARY_VERSIONED_SCHEMAS;
use super::trait_def::LibraryStore;
use crate::sqlite_persistence::open_versioned_db;
use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};

pub struct SqliteLibraryStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLibraryStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_versioned_db(db_path.as_ref(), LIBRARY_VERSIONED_SCHEMAS)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Extracts `artist_name` from an entity's `extra_json` blob. Missing or
    /// unparseable blobs yield an empty string, never an error.
    fn artist_name_from_extra_json(extra_json: Option<&str>) -> String {
        let Some(raw) = extra_json else {
            return String::new();
        };
        serde_json::from_str::<serde_json::Value>(raw)
            .ok()
            .and_then(|v| v.get("artist_name").and_then(|n| n.as_str()).map(String::from))
            .unwrap_or_default()
    }

    fn labeled_entry(
        kind: EntityKind,
        entity_id: String,
        name: Option<String>,
        extra_json: Option<String>,
    ) -> (String, String) {
        let artist = match kind {
            EntityKind::Track | EntityKind::Album => {
                Self::artist_name_from_extra_json(extra_json.as_deref())
            }
            EntityKind::Artist => String::new(),
        };
        // Fall back to the raw entity id when no metadata row exists.
        let name = match name {
            Some(name) if !name.is_empty() => name,
            _ => entity_id,
        };
        (name, artist)
    }
}

impl LibraryStore for SqliteLibraryStore {
    fn highly_rated(&self, user_id: i64, min_score: u8, limit: usize) -> Result<Vec<RatedEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT r.entity_type, r.entity_id, r.score, em.name, em.extra_json
             FROM ratings r
             LEFT JOIN entity_metadata em
               ON r.entity_type = em.entity_type AND r.entity_id = em.entity_id
             WHERE r.user_id = ?1 AND r.score >= ?2
             ORDER BY r.score DESC, r.created DESC
             LIMIT ?3",
        )?;
        let rows = stmt.query_map(params![user_id, min_score, limit as i64], |row| {
            let kind_str: String = row.get(0)?;
            let entity_id: String = row.get(1)?;
            let score: u8 = row.get(2)?;
            let name: Option<String> = row.get(3)?;
            let extra_json: Option<String> = row.get(4)?;
            Ok((kind_str, entity_id, score, name, extra_json))
        })?;

        let mut results = Vec::new();
        for row in rows {
            let (kind_str, entity_id, score, name, extra_json) = row?;
            let kind = EntityKind::parse(&kind_str).unwrap_or(EntityKind::Track);
            let (name, artist) = Self::labeled_entry(kind, entity_id, name, extra_json);
            results.push(RatedEntry {
                kind,
                name,
                artist,
                score,
            });
        }
        Ok(results)
    }

    fn on_rotation(&self, user_id: i64, limit: usize) -> Result<Vec<ShelfEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT s.entity_type, s.entity_id, em.name, em.extra_json
             FROM shelves s
             LEFT JOIN entity_metadata em
               ON s.entity_type = em.entity_type AND s.entity_id = em.entity_id
             WHERE s.user_id = ?1 AND s.status = ?2
             ORDER BY s.id
             LIMIT ?3",
        )?;
        let rows = stmt.query_map(
            params![user_id, ShelfStatus::OnRotation.as_str(), limit as i64],
            |row| {
                let kind_str: String = row.get(0)?;
                let entity_id: String = row.get(1)?;
                let name: Option<String> = row.get(2)?;
                let extra_json: Option<String> = row.get(3)?;
                Ok((kind_str, entity_id, name, extra_json))
            },
        )?;

        let mut results = Vec::new();
        for row in rows {
            let (kind_str, entity_id, name, extra_json) = row?;
            let kind = EntityKind::parse(&kind_str).unwrap_or(EntityKind::Track);
            let (name, artist) = Self::labeled_entry(kind, entity_id, name, extra_json);
            results.push(ShelfEntry { kind, name, artist });
        }
        Ok(results)
    }

    fn tag_names(&self, user_id: i64) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT name FROM tags WHERE user_id = ?1 ORDER BY name")?;
        let names = stmt
            .query_map(params![user_id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(names)
    }

    fn listening_hours(&self, user_id: i64, limit: usize) -> Result<Vec<HourEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT CAST(strftime('%H', played_at) AS INTEGER) AS hour, COUNT(*) AS cnt
             FROM listening_history
             WHERE user_id = ?1
             GROUP BY hour
             ORDER BY cnt DESC, hour
             LIMIT ?2",
        )?;
        let hours = stmt
            .query_map(params![user_id, limit as i64], |row| {
                Ok(HourEntry {
                    hour: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(hours)
    }

    fn upsert_rating(
        &self,
        user_id: i64,
        kind: EntityKind,
        entity_id: &str,
        score: u8,
    ) -> Result<()> {
        if !(1..=10).contains(&score) {
            bail!("Rating score {} is out of range (1-10)", score);
        }
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO ratings (user_id, entity_type, entity_id, score)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (user_id, entity_type, entity_id)
             DO UPDATE SET score = excluded.score, created = datetime('now')",
            params![user_id, kind.as_str(), entity_id, score],
        )?;
        Ok(())
    }

    fn set_shelf_status(
        &self,
        user_id: i64,
        kind: EntityKind,
        entity_id: &str,
        status: ShelfStatus,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO shelves (user_id, entity_type, entity_id, status)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (user_id, entity_type, entity_id)
             DO UPDATE SET status = excluded.status",
            params![user_id, kind.as_str(), entity_id, status.as_str()],
        )?;
        Ok(())
    }

    fn add_tag(&self, user_id: i64, name: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO tags (user_id, name) VALUES (?1, ?2)",
            params![user_id, name],
        )?;
        Ok(())
    }

    fn record_play(&self, user_id: i64, track_id: &str, played_at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO listening_history (user_id, track_id, played_at)
             VALUES (?1, ?2, ?3)",
            params![user_id, track_id, played_at.to_rfc3339()],
        )?;
        Ok(())
    }

    fn upsert_entity_metadata(
        &self,
        kind: EntityKind,
        entity_id: &str,
        name: Option<&str>,
        extra_json: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO entity_metadata (entity_type, entity_id, name, extra_json)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (entity_type, entity_id)
             DO UPDATE SET name = excluded.name, extra_json = excluded.extra_json",
            params![kind.as_str(), entity_id, name, extra_json],
        )?;
        Ok(())
    }
}
