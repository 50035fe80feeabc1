//! Database connection management
//!
//! Provides utilities for opening and configuring SQLite connections for
//! either backend.

#![allow(clippy::result_large_err)]

use crate::errors::{connection_error, from_rusqlite, io_error, Result};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::time::Duration;
use twinstore_core::BackendKind;

/// Open an existing database; a missing file is a connection failure
pub fn open_existing<P: AsRef<Path>>(path: P, backend: BackendKind) -> Result<Connection> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| connection_error(backend, e))
}

/// Open a database, creating the file and its parent directory if needed
pub fn open_or_create<P: AsRef<Path>>(path: P, backend: BackendKind) -> Result<Connection> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_error("create_dir", e))?;
    }
    Connection::open(path).map_err(|e| connection_error(backend, e))
}

/// Relational settings: enforced foreign keys, WAL, waiting on locks
pub fn configure_primary(conn: &Connection, busy_timeout: Duration) -> Result<()> {
    let tag = |e| from_rusqlite(BackendKind::Primary, e);
    conn.pragma_update(None, "foreign_keys", true).map_err(tag)?;
    conn.pragma_update(None, "journal_mode", "WAL").map_err(tag)?;
    conn.busy_timeout(busy_timeout).map_err(tag)?;
    Ok(())
}

/// Distributed-store settings: no foreign keys, WAL, and lock conflicts
/// reported immediately so the transaction runner can retry them
pub fn configure_secondary(conn: &Connection) -> Result<()> {
    let tag = |e| from_rusqlite(BackendKind::Secondary, e);
    conn.pragma_update(None, "foreign_keys", false).map_err(tag)?;
    conn.pragma_update(None, "journal_mode", "WAL").map_err(tag)?;
    conn.busy_timeout(Duration::ZERO).map_err(tag)?;
    Ok(())
}
