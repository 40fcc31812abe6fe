mod versioned_schema;

pub use versioned_schema::{
    Column, SqlType, Table, VersionedSchema, BASE_DB_VERSION, DEFAULT_CREATED_AT,
};

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use tracing::info;

/// Opens a SQLite database, creating it with the newest schema when the file
/// does not exist yet, otherwise validating the stored version and running any
/// pending migrations.
pub fn open_versioned_db(path: &Path, schemas: &[VersionedSchema]) -> Result<Connection> {
    let is_new_db = !path.exists();
    let mut conn =
        Connection::open(path).with_context(|| format!("Failed to open database {:?}", path))?;

    let newest = schemas
        .last()
        .context("At least one schema version is required")?;

    if is_new_db {
        info!("Creating new database at {:?}", path);
        newest.create(&conn)?;
        return Ok(conn);
    }

    let raw_version: i64 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    let db_version = raw_version - BASE_DB_VERSION as i64;
    if db_version < 1 {
        anyhow::bail!(
            "Database {:?} version {} is invalid (expected >= 1)",
            path,
            db_version
        );
    }

    let known = schemas
        .iter()
        .position(|s| s.version == db_version as usize)
        .with_context(|| format!("Unknown database version {} in {:?}", db_version, path))?;
    schemas[known]
        .validate(&conn)
        .with_context(|| format!("Schema validation failed for version {}", db_version))?;

    if (db_version as usize) < newest.version {
        info!(
            "Migrating database {:?} from version {} to {}",
            path, db_version, newest.version
        );
        migrate(&mut conn, schemas, db_version as usize)?;
    }

    Ok(conn)
}

fn migrate(conn: &mut Connection, schemas: &[VersionedSchema], from_version: usize) -> Result<()> {
    let tx = conn.transaction()?;
    let mut latest = from_version;
    for schema in schemas.iter().filter(|s| s.version > from_version) {
        if let Some(migration_fn) = schema.migration {
            migration_fn(&tx)
                .with_context(|| format!("Failed to migrate to version {}", schema.version))?;
        }
        latest = schema.version;
    }
    tx.execute(
        &format!("PRAGMA user_version = {}", BASE_DB_VERSION + latest),
        [],
    )?;
    tx.commit()?;
    Ok(())
}
