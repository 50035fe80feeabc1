//! Secondary store adapter
//!
//! Distributed-store behaviour over SQLite: one process-wide client,
//! writer-supplied identifiers, named parameters that must carry a type
//! binding matching their value, and a transaction runner that re-runs the
//! caller's callback when the store reports contention.

#![allow(clippy::result_large_err)]

use crate::codec::{collect_rows, to_sql};
use crate::config::RetryPolicy;
use crate::db;
use crate::errors::{client_closed, from_rusqlite, Result};
use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::types::{ToSql, Value as SqlValue};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, warn};
use twinstore_core::{
    BackendKind, ExError, ExErrorKind, FieldType, Row, SecondaryStore, SecondaryTxn,
    TypedStatement,
};

const BACKEND: BackendKind = BackendKind::Secondary;

/// Process-wide secondary client
pub struct SqliteSecondary {
    conn: Mutex<Option<Connection>>,
    retry: RetryPolicy,
}

impl SqliteSecondary {
    /// Open the client on an existing database file
    pub fn connect<P: AsRef<Path>>(path: P, retry: RetryPolicy) -> Result<Self> {
        let conn = db::open_existing(path, BACKEND)?;
        db::configure_secondary(&conn)?;
        Ok(Self::from_connection(conn, retry))
    }

    /// Wrap an already configured connection
    pub fn from_connection(conn: Connection, retry: RetryPolicy) -> Self {
        Self {
            conn: Mutex::new(Some(conn)),
            retry,
        }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Close the client; every later call fails with a connection error
    pub fn shutdown(&self) {
        if self.lock().take().is_some() {
            debug!(backend = %BACKEND, "client shut down");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lock().is_none()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Connection>> {
        self.conn.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn attempt_once(
        conn: &Connection,
        attempt_no: u32,
        attempt: &mut dyn FnMut(&mut dyn SecondaryTxn) -> Result<()>,
    ) -> Result<()> {
        conn.execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| from_rusqlite(BACKEND, e))?;

        let mut txn = SqliteTxn {
            conn,
            commit_ts: Utc::now().trunc_subsecs(3),
        };
        let outcome = attempt(&mut txn).and_then(|()| {
            conn.execute_batch("COMMIT")
                .map_err(|e| from_rusqlite(BACKEND, e).with_op("commit"))
        });

        if let Err(err) = outcome {
            if !conn.is_autocommit() {
                if let Err(rb) = conn.execute_batch("ROLLBACK") {
                    warn!(backend = %BACKEND, attempt = attempt_no, error = %rb, "rollback failed");
                }
            }
            return Err(err);
        }
        Ok(())
    }
}

impl SecondaryStore for SqliteSecondary {
    fn run_attempts(
        &self,
        attempt: &mut dyn FnMut(&mut dyn SecondaryTxn) -> Result<()>,
    ) -> Result<()> {
        let guard = self.lock();
        let conn = guard.as_ref().ok_or_else(client_closed)?;

        let mut attempt_no: u32 = 0;
        loop {
            attempt_no += 1;
            match Self::attempt_once(conn, attempt_no, attempt) {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ExErrorKind::Contention => {
                    if attempt_no > self.retry.max_retries {
                        return Err(ExError::new(ExErrorKind::BackendExecution)
                            .with_op("run_in_transaction")
                            .with_backend(BACKEND)
                            .with_message(format!(
                                "transaction aborted after {} attempts",
                                attempt_no
                            ))
                            .with_source(err));
                    }
                    let delay = self.retry.backoff(attempt_no);
                    debug!(
                        backend = %BACKEND,
                        attempt = attempt_no,
                        delay_ms = delay.as_millis() as u64,
                        "contention, retrying transaction"
                    );
                    std::thread::sleep(delay);
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn snapshot(&self, stmt: &TypedStatement, shape: &[FieldType]) -> Result<Vec<Row>> {
        let guard = self.lock();
        let conn = guard.as_ref().ok_or_else(client_closed)?;
        run_query(conn, stmt, shape)
    }
}

/// Callback handle for one transaction attempt
struct SqliteTxn<'c> {
    conn: &'c Connection,
    commit_ts: DateTime<Utc>,
}

impl SecondaryTxn for SqliteTxn<'_> {
    fn execute_sql(&mut self, stmt: &TypedStatement, shape: &[FieldType]) -> Result<Vec<Row>> {
        run_query(self.conn, stmt, shape)
    }

    fn execute_update(&mut self, stmt: &TypedStatement) -> Result<usize> {
        let bound = bind(stmt)?;
        self.conn
            .execute(&stmt.sql, named(&bound).as_slice())
            .map_err(|e| from_rusqlite(BACKEND, e))
    }

    fn commit_timestamp(&self) -> DateTime<Utc> {
        self.commit_ts
    }
}

/// Check every parameter against its declared type and convert it
fn bind(stmt: &TypedStatement) -> Result<Vec<(String, SqlValue)>> {
    stmt.params
        .iter()
        .map(|p| {
            if !p.value.fits(p.ty) {
                return Err(ExError::new(ExErrorKind::BackendExecution)
                    .with_op("bind")
                    .with_backend(BACKEND)
                    .with_message(format!(
                        "parameter @{} is declared {} but bound to a {} value",
                        p.name,
                        p.ty,
                        p.value.type_name()
                    )));
            }
            Ok((format!("@{}", p.name), to_sql(&p.value)))
        })
        .collect()
}

fn named(bound: &[(String, SqlValue)]) -> Vec<(&str, &dyn ToSql)> {
    bound
        .iter()
        .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
        .collect()
}

fn run_query(conn: &Connection, stmt: &TypedStatement, shape: &[FieldType]) -> Result<Vec<Row>> {
    let bound = bind(stmt)?;
    let mut prepared = conn
        .prepare(&stmt.sql)
        .map_err(|e| from_rusqlite(BACKEND, e))?;
    collect_rows(BACKEND, &mut prepared, named(&bound).as_slice(), shape)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::{apply_migrations, Schema};
    use std::cell::Cell;
    use twinstore_core::{TypedParam, Value};

    fn setup() -> (tempfile::TempDir, std::path::PathBuf, SqliteSecondary) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secondary.db");
        let mut conn = Connection::open(&path).unwrap();
        apply_migrations(&mut conn, Schema::Secondary).unwrap();
        drop(conn);
        let policy = RetryPolicy {
            max_retries: 2,
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
        };
        let store = SqliteSecondary::connect(&path, policy).unwrap();
        (dir, path, store)
    }

    fn insert_widget(id: i64) -> TypedStatement {
        TypedStatement::new(
            "INSERT INTO products (product_id, name, category, price, description) \
             VALUES (@product_id, @name, @category, @price, @description)",
            vec![
                TypedParam::new("product_id", Value::Int(id), FieldType::Int64),
                TypedParam::new("name", "Widget".into(), FieldType::String),
                TypedParam::new("category", "Tools".into(), FieldType::String),
                TypedParam::new("price", Value::Float(9.99), FieldType::Float64),
                TypedParam::new("description", Value::Null, FieldType::String),
            ],
        )
    }

    #[test]
    fn test_callback_commits() {
        let (_dir, _path, store) = setup();
        let secondary: &dyn SecondaryStore = &store;
        let affected = secondary
            .run_in_transaction(|txn| txn.execute_update(&insert_widget(1)))
            .unwrap();
        assert_eq!(affected, 1);
        let rows = store
            .snapshot(
                &TypedStatement::new("SELECT name FROM products WHERE product_id = 1", vec![]),
                &[FieldType::String],
            )
            .unwrap();
        assert_eq!(rows, vec![vec![Value::Text("Widget".into())]]);
    }

    #[test]
    fn test_failed_callback_rolls_back() {
        let (_dir, _path, store) = setup();
        let secondary: &dyn SecondaryStore = &store;
        let err = secondary
            .run_in_transaction(|txn| {
                txn.execute_update(&insert_widget(1))?;
                txn.execute_update(&insert_widget(1))
            })
            .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::BackendExecution);
        let rows = store
            .snapshot(
                &TypedStatement::new("SELECT COUNT(*) FROM products", vec![]),
                &[FieldType::Int64],
            )
            .unwrap();
        assert_eq!(rows[0][0], Value::Int(0));
    }

    #[test]
    fn test_mistyped_binding_rejected() {
        let (_dir, _path, store) = setup();
        let stmt = TypedStatement::new(
            "SELECT name FROM products WHERE product_id = @id",
            vec![TypedParam::new("id", "one".into(), FieldType::Int64)],
        );
        let err = store.snapshot(&stmt, &[FieldType::String]).unwrap_err();
        assert_eq!(err.op(), Some("bind"));
    }

    #[test]
    fn test_contention_exhausts_retries() {
        let (_dir, path, store) = setup();
        let holder = Connection::open(&path).unwrap();
        holder.execute_batch("BEGIN IMMEDIATE").unwrap();

        let calls = Cell::new(0);
        let secondary: &dyn SecondaryStore = &store;
        let err = secondary
            .run_in_transaction(|txn| {
                calls.set(calls.get() + 1);
                txn.execute_update(&insert_widget(1))
            })
            .unwrap_err();

        assert_eq!(err.kind(), ExErrorKind::BackendExecution);
        assert_eq!(
            err.source_error().map(|e| e.kind()),
            Some(ExErrorKind::Contention)
        );
        assert_eq!(calls.get(), 0, "callback never runs while the lock is held");
        holder.execute_batch("ROLLBACK").unwrap();
    }

    #[test]
    fn test_shutdown_refuses_calls() {
        let (_dir, _path, store) = setup();
        store.shutdown();
        assert!(store.is_closed());
        let secondary: &dyn SecondaryStore = &store;
        let err = secondary
            .run_in_transaction(|txn| txn.execute_update(&insert_widget(1)))
            .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Connection);
        assert_eq!(err.backend(), Some(BackendKind::Secondary));
    }

    #[test]
    fn test_commit_timestamp_is_millisecond_precision() {
        let (_dir, _path, store) = setup();
        let secondary: &dyn SecondaryStore = &store;
        let ts = secondary
            .run_in_transaction(|txn| Ok(txn.commit_timestamp()))
            .unwrap();
        assert_eq!(ts, ts.trunc_subsecs(3));
    }
}
