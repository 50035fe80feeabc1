//! Primary store adapter
//!
//! Relational behaviour over SQLite: identifiers come from
//! `AUTOINCREMENT`, foreign keys are enforced and every operation opens its
//! own connection, released when the operation ends.

#![allow(clippy::result_large_err)]

use crate::codec::{collect_rows, to_sql};
use crate::db;
use crate::errors::{from_rusqlite, Result};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};
use twinstore_core::{BackendKind, FieldType, PrimaryStore, PrimaryUnit, Row, Statement};

const BACKEND: BackendKind = BackendKind::Primary;

/// Connection provider for the primary database file
#[derive(Debug, Clone)]
pub struct SqlitePrimary {
    path: PathBuf,
    busy_timeout: Duration,
}

impl SqlitePrimary {
    pub fn new(path: impl Into<PathBuf>, busy_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            busy_timeout,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open and configure a fresh connection
    pub fn connect(&self) -> Result<Connection> {
        let conn = db::open_existing(&self.path, BACKEND)?;
        db::configure_primary(&conn, self.busy_timeout)?;
        Ok(conn)
    }
}

fn params(stmt: &Statement) -> rusqlite::ParamsFromIter<Vec<rusqlite::types::Value>> {
    rusqlite::params_from_iter(stmt.params.iter().map(to_sql).collect::<Vec<_>>())
}

fn query(conn: &Connection, stmt: &Statement, shape: &[FieldType]) -> Result<Vec<Row>> {
    let mut prepared = conn
        .prepare(&stmt.sql)
        .map_err(|e| from_rusqlite(BACKEND, e))?;
    collect_rows(BACKEND, &mut prepared, params(stmt), shape)
}

impl PrimaryStore for SqlitePrimary {
    fn begin(&self) -> Result<Box<dyn PrimaryUnit>> {
        let conn = self.connect()?;
        conn.execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| from_rusqlite(BACKEND, e))?;
        debug!(backend = %BACKEND, "unit opened");
        Ok(Box::new(SqliteUnit { conn: Some(conn) }))
    }

    fn read(&self, stmt: &Statement, shape: &[FieldType]) -> Result<Vec<Row>> {
        let conn = self.connect()?;
        query(&conn, stmt, shape)
    }
}

/// An open primary transaction; rolled back on drop unless finished
pub struct SqliteUnit {
    conn: Option<Connection>,
}

impl SqliteUnit {
    fn conn(&self) -> Result<&Connection> {
        self.conn.as_ref().ok_or_else(|| {
            twinstore_core::ExError::new(twinstore_core::ExErrorKind::Internal)
                .with_backend(BACKEND)
                .with_message("unit already finished")
        })
    }

    fn finish(&mut self, sql: &str) -> Result<()> {
        let conn = self.conn.take();
        match conn {
            Some(conn) => conn
                .execute_batch(sql)
                .map_err(|e| from_rusqlite(BACKEND, e)),
            None => Ok(()),
        }
    }
}

impl PrimaryUnit for SqliteUnit {
    fn query(&mut self, stmt: &Statement, shape: &[FieldType]) -> Result<Vec<Row>> {
        query(self.conn()?, stmt, shape)
    }

    fn execute(&mut self, stmt: &Statement) -> Result<usize> {
        self.conn()?
            .execute(&stmt.sql, params(stmt))
            .map_err(|e| from_rusqlite(BACKEND, e))
    }

    fn commit(mut self: Box<Self>) -> Result<()> {
        let conn = self.conn()?;
        if let Err(e) = conn.execute_batch("COMMIT") {
            let err = from_rusqlite(BACKEND, e).with_op("commit");
            if let Err(rb) = self.finish("ROLLBACK") {
                warn!(backend = %BACKEND, error = %rb, "rollback after failed commit failed");
            }
            return Err(err);
        }
        self.conn = None;
        debug!(backend = %BACKEND, "unit committed");
        Ok(())
    }

    fn rollback(mut self: Box<Self>) -> Result<()> {
        self.finish("ROLLBACK")
            .map_err(|e| e.with_op("rollback"))?;
        debug!(backend = %BACKEND, "unit rolled back");
        Ok(())
    }
}

impl Drop for SqliteUnit {
    fn drop(&mut self) {
        if self.conn.is_some() {
            if let Err(e) = self.finish("ROLLBACK") {
                warn!(backend = %BACKEND, error = %e, "rollback of abandoned unit failed");
            }
        }
    }
}
