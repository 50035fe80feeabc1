#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use twinstore_core::{
    BackendKind, ExError, ExErrorKind, FieldType, Mutation, PrimaryStore, PrimaryUnit, Result,
    Row, SecondaryStore, SecondaryTxn, Statement, TypedStatement, Value,
};
use twinstore_store::{BackendConfig, Backends, RetryPolicy, SqliteSecondary};

/// Both stores initialised in a temporary directory
pub struct TestStores {
    pub dir: TempDir,
    pub config: BackendConfig,
    pub backends: Backends,
}

impl TestStores {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = BackendConfig::new(dir.path().join("primary.db"))
            .with_secondary(dir.path().join("secondary.db"));
        Backends::init_schema(&config).expect("init schema");
        let backends = Backends::connect(&config);
        assert!(backends.secondary().is_some(), "secondary should connect");
        Self {
            dir,
            config,
            backends,
        }
    }

    pub fn secondary_path(&self) -> PathBuf {
        self.dir.path().join("secondary.db")
    }

    /// A second secondary client on the same file, with its own retry policy
    pub fn secondary_client(&self, retry: RetryPolicy) -> SqliteSecondary {
        SqliteSecondary::connect(self.secondary_path(), retry).expect("secondary client")
    }

    pub fn primary(&self) -> &dyn PrimaryStore {
        self.backends.primary()
    }

    pub fn secondary(&self) -> &dyn SecondaryStore {
        self.backends.secondary().expect("secondary")
    }
}

pub fn widget() -> Mutation {
    Mutation::create(
        "product",
        vec![
            ("name", Value::from("Widget")),
            ("category", "Tools".into()),
            ("price", Value::Float(9.99)),
        ],
    )
    .expect("valid product")
}

pub fn product(name: &str, price: f64) -> Mutation {
    Mutation::create(
        "product",
        vec![
            ("name", Value::from(name)),
            ("category", "Parts".into()),
            ("price", Value::Float(price)),
            ("description", "test item".into()),
        ],
    )
    .expect("valid product")
}

pub fn employee(first: &str) -> Mutation {
    Mutation::create(
        "employee",
        vec![
            ("first_name", Value::from(first)),
            ("last_name", "Tester".into()),
            ("position", "Clerk".into()),
            (
                "hire_date",
                Value::Date(NaiveDate::from_ymd_opt(2020, 1, 15).expect("date")),
            ),
        ],
    )
    .expect("valid employee")
}

pub fn customer(first: &str) -> Mutation {
    Mutation::create(
        "customer",
        vec![
            ("first_name", Value::from(first)),
            ("last_name", "Buyer".into()),
            ("email", format!("{}@example.com", first.to_lowercase()).into()),
            (
                "join_date",
                Value::Date(NaiveDate::from_ymd_opt(2021, 6, 1).expect("date")),
            ),
        ],
    )
    .expect("valid customer")
}

pub fn order(product_id: i64, employee_id: i64, customer_id: Option<i64>, qty: i64) -> Mutation {
    Mutation::create(
        "sales_order",
        vec![
            ("product_id", Value::Int(product_id)),
            ("quantity", Value::Int(qty)),
            ("employee_id", Value::Int(employee_id)),
            ("customer_id", Value::from(customer_id)),
            ("total_price", Value::Float(qty as f64 * 2.5)),
        ],
    )
    .expect("valid order")
}

/// Count rows of a table in the primary store
pub fn primary_count(primary: &dyn PrimaryStore, sql: &str) -> i64 {
    let rows = primary
        .read(&Statement::new(sql, vec![]), &[FieldType::Int64])
        .expect("count");
    rows[0][0].as_i64().expect("integer count")
}

/// Count rows of a table in the secondary store
pub fn secondary_count(secondary: &dyn SecondaryStore, sql: &str) -> i64 {
    let rows = secondary
        .snapshot(&TypedStatement::new(sql, vec![]), &[FieldType::Int64])
        .expect("count");
    rows[0][0].as_i64().expect("integer count")
}

fn injected(message: &str) -> ExError {
    ExError::new(ExErrorKind::BackendExecution)
        .with_backend(BackendKind::Secondary)
        .with_message(message.to_string())
}

/// Runs every callback for real, then aborts the transaction
pub struct FailingSecondary<'a> {
    pub inner: &'a dyn SecondaryStore,
}

impl SecondaryStore for FailingSecondary<'_> {
    fn run_attempts(
        &self,
        attempt: &mut dyn FnMut(&mut dyn SecondaryTxn) -> Result<()>,
    ) -> Result<()> {
        self.inner.run_attempts(&mut |txn| {
            attempt(txn)?;
            Err(injected("injected secondary failure"))
        })
    }

    fn snapshot(&self, stmt: &TypedStatement, shape: &[FieldType]) -> Result<Vec<Row>> {
        self.inner.snapshot(stmt, shape)
    }
}

/// Aborts the first attempt with contention and lets a competing writer
/// commit `competitor` before the callback is re-run
pub struct InterferingSecondary {
    pub inner: SqliteSecondary,
    pub path: PathBuf,
    pub competitor: &'static str,
    pub attempts: AtomicUsize,
}

impl SecondaryStore for InterferingSecondary {
    fn run_attempts(
        &self,
        attempt: &mut dyn FnMut(&mut dyn SecondaryTxn) -> Result<()>,
    ) -> Result<()> {
        loop {
            let n = self.attempts.fetch_add(1, Ordering::SeqCst);
            let result = self.inner.run_attempts(&mut |txn| {
                attempt(txn)?;
                if n == 0 {
                    return Err(ExError::new(ExErrorKind::Contention)
                        .with_backend(BackendKind::Secondary)
                        .with_message("aborted by a concurrent writer"));
                }
                Ok(())
            });
            match result {
                Err(_) if n == 0 => {
                    let conn = rusqlite::Connection::open(&self.path).expect("competitor");
                    conn.execute_batch(self.competitor).expect("competitor write");
                }
                other => return other,
            }
        }
    }

    fn snapshot(&self, stmt: &TypedStatement, shape: &[FieldType]) -> Result<Vec<Row>> {
        self.inner.snapshot(stmt, shape)
    }
}

/// Counts units opened on the wrapped primary
pub struct CountingPrimary<'a> {
    pub inner: &'a dyn PrimaryStore,
    pub begins: AtomicUsize,
}

impl<'a> CountingPrimary<'a> {
    pub fn new(inner: &'a dyn PrimaryStore) -> Self {
        Self {
            inner,
            begins: AtomicUsize::new(0),
        }
    }

    pub fn begins(&self) -> usize {
        self.begins.load(Ordering::SeqCst)
    }
}

impl PrimaryStore for CountingPrimary<'_> {
    fn begin(&self) -> Result<Box<dyn PrimaryUnit>> {
        self.begins.fetch_add(1, Ordering::SeqCst);
        self.inner.begin()
    }

    fn read(&self, stmt: &Statement, shape: &[FieldType]) -> Result<Vec<Row>> {
        self.inner.read(stmt, shape)
    }
}
