//! Backend capabilities
//!
//! The coordinator never talks to a driver directly. Each store is reached
//! through one of two capabilities:
//!
//! - [`PrimaryStore`]: parameterised reads plus an atomic unit
//!   ([`PrimaryUnit`]) that is committed or rolled back explicitly, and
//!   rolled back when dropped while still open.
//! - [`SecondaryStore`]: snapshot reads plus a retrying transaction runner
//!   that may invoke the caller's callback more than once.

use crate::errors::{ExError, ExErrorKind, Result};
use crate::model::{FieldType, Value};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Primary,
    Secondary,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Primary => twinstore_core_types::schema::BACKEND_PRIMARY,
            BackendKind::Secondary => twinstore_core_types::schema::BACKEND_SECONDARY,
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row as returned by a backend, decoded against the requested shape
pub type Row = Vec<Value>;

/// Statement for the primary store (positional `?N` parameters)
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// Named parameter with an explicit type binding
#[derive(Debug, Clone, PartialEq)]
pub struct TypedParam {
    pub name: String,
    pub value: Value,
    pub ty: FieldType,
}

impl TypedParam {
    pub fn new(name: impl Into<String>, value: Value, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            value,
            ty,
        }
    }
}

/// Statement for the secondary store (named `@param` parameters)
#[derive(Debug, Clone, PartialEq)]
pub struct TypedStatement {
    pub sql: String,
    pub params: Vec<TypedParam>,
}

impl TypedStatement {
    pub fn new(sql: impl Into<String>, params: Vec<TypedParam>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    pub fn param(&self, name: &str) -> Option<&TypedParam> {
        self.params.iter().find(|p| p.name == name)
    }
}

/// Relational store reached through one connection per operation
pub trait PrimaryStore: Send + Sync {
    /// Open an atomic unit on a fresh connection.
    ///
    /// # Errors
    ///
    /// `Connection` if no connection can be obtained.
    fn begin(&self) -> Result<Box<dyn PrimaryUnit>>;

    /// Run a read outside any unit.
    ///
    /// # Errors
    ///
    /// `Connection` or `BackendExecution`.
    fn read(&self, stmt: &Statement, shape: &[FieldType]) -> Result<Vec<Row>>;
}

/// An open primary transaction
pub trait PrimaryUnit {
    /// Run a statement that returns rows (including `RETURNING`).
    ///
    /// # Errors
    ///
    /// `BackendExecution` if the statement fails.
    fn query(&mut self, stmt: &Statement, shape: &[FieldType]) -> Result<Vec<Row>>;

    /// Run a statement and report the affected row count.
    ///
    /// # Errors
    ///
    /// `BackendExecution` if the statement fails.
    fn execute(&mut self, stmt: &Statement) -> Result<usize>;

    /// # Errors
    ///
    /// `BackendExecution` if the commit is refused; the unit is rolled back.
    fn commit(self: Box<Self>) -> Result<()>;

    /// # Errors
    ///
    /// `BackendExecution` if the rollback itself fails.
    fn rollback(self: Box<Self>) -> Result<()>;
}

/// Distributed store reached through a process-wide client
pub trait SecondaryStore: Send + Sync {
    /// Run `attempt` inside a read-write transaction, re-running it from
    /// scratch whenever the store reports contention.
    ///
    /// # Errors
    ///
    /// `Connection` when the client is shut down, `BackendExecution` when
    /// the callback fails or retries are exhausted.
    fn run_attempts(
        &self,
        attempt: &mut dyn FnMut(&mut dyn SecondaryTxn) -> Result<()>,
    ) -> Result<()>;

    /// Read from a consistent snapshot.
    ///
    /// # Errors
    ///
    /// `Connection` or `BackendExecution`.
    fn snapshot(&self, stmt: &TypedStatement, shape: &[FieldType]) -> Result<Vec<Row>>;
}

/// Handle passed to a secondary transaction callback
pub trait SecondaryTxn {
    /// # Errors
    ///
    /// `Contention` or `BackendExecution`.
    fn execute_sql(&mut self, stmt: &TypedStatement, shape: &[FieldType]) -> Result<Vec<Row>>;

    /// # Errors
    ///
    /// `Contention` or `BackendExecution`.
    fn execute_update(&mut self, stmt: &TypedStatement) -> Result<usize>;

    /// Commit timestamp this attempt will carry if it commits
    fn commit_timestamp(&self) -> DateTime<Utc>;
}

impl dyn SecondaryStore + '_ {
    /// Run `f` in a retrying transaction and return its result.
    ///
    /// `f` takes `Fn`, not `FnMut`: it may run several times and must not
    /// accumulate state across attempts.
    ///
    /// # Errors
    ///
    /// Whatever the runner or the last attempt of `f` reports.
    pub fn run_in_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: Fn(&mut dyn SecondaryTxn) -> Result<T>,
    {
        let mut out = None;
        self.run_attempts(&mut |txn| {
            out = Some(f(txn)?);
            Ok(())
        })?;
        out.ok_or_else(|| {
            ExError::new(ExErrorKind::Internal)
                .with_op("run_in_transaction")
                .with_backend(BackendKind::Secondary)
                .with_message("transaction committed without running its callback")
        })
    }
}
