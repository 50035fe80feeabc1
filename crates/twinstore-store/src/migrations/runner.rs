//! Migration runner
//!
//! Applies migrations with checksums and idempotency

#![allow(clippy::result_large_err)]

use crate::errors::{checksum_mismatch, from_rusqlite, migration_error, Result};
use crate::migrations::checksums::compute_checksum;
use crate::migrations::embedded::{Migration, Schema};
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};
use twinstore_core::BackendKind;

/// Apply all pending migrations of `schema` to the database
pub fn apply_migrations(conn: &mut Connection, schema: Schema) -> Result<()> {
    let backend = schema.backend();
    create_schema_version_table(conn, backend)?;

    for migration in schema.migrations() {
        apply_migration(conn, backend, &migration)?;
    }

    Ok(())
}

/// Identifiers of the migrations recorded in the database, in order applied
pub fn applied_migrations(conn: &Connection) -> Result<Vec<String>> {
    let tag = |e| from_rusqlite(BackendKind::Primary, e);
    let mut stmt = conn
        .prepare("SELECT migration_id FROM schema_version ORDER BY id")
        .map_err(tag)?;
    let ids = stmt
        .query_map([], |row| row.get(0))
        .map_err(tag)?
        .collect::<std::result::Result<Vec<String>, _>>()
        .map_err(tag)?;
    Ok(ids)
}

/// Create the schema_version table if it doesn't exist
fn create_schema_version_table(conn: &Connection, backend: BackendKind) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY,
            migration_id TEXT NOT NULL UNIQUE,
            applied_at INTEGER NOT NULL,
            checksum TEXT
        )",
        [],
    )
    .map_err(|e| from_rusqlite(backend, e))?;

    Ok(())
}

/// Apply a single migration if not already applied
fn apply_migration(conn: &mut Connection, backend: BackendKind, migration: &Migration) -> Result<()> {
    let tag = |e| from_rusqlite(backend, e);
    let checksum = compute_checksum(migration.sql);

    let recorded: Option<Option<String>> = conn
        .query_row(
            "SELECT checksum FROM schema_version WHERE migration_id = ?1",
            [migration.id],
            |row| row.get(0),
        )
        .optional()
        .map_err(tag)?;

    if let Some(recorded) = recorded {
        return match recorded {
            Some(expected) if expected != checksum => {
                Err(checksum_mismatch(migration.id, &expected, &checksum))
            }
            _ => {
                debug!(migration = migration.id, %backend, "migration already applied");
                Ok(())
            }
        };
    }

    let tx = conn.transaction().map_err(tag)?;

    tx.execute_batch(migration.sql)
        .map_err(|e| migration_error(migration.id, &e.to_string()).with_backend(backend))?;

    let now = chrono::Utc::now().timestamp();
    tx.execute(
        "INSERT INTO schema_version (migration_id, applied_at, checksum) VALUES (?1, ?2, ?3)",
        rusqlite::params![migration.id, now, checksum],
    )
    .map_err(tag)?;

    tx.commit().map_err(tag)?;
    info!(migration = migration.id, %backend, "migration applied");

    Ok(())
}
