// Integration tests for the migration framework on both schemas

use rusqlite::Connection;
use twinstore_store::migrations::{applied_migrations, apply_migrations, Schema};

fn get_table_names(conn: &Connection) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
        .unwrap();
    stmt.query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<String>, _>>()
        .unwrap()
}

#[test]
fn test_primary_schema_tables() {
    let mut conn = Connection::open_in_memory().expect("Failed to create in-memory database");
    apply_migrations(&mut conn, Schema::Primary).unwrap();

    let tables = get_table_names(&conn);
    for expected in [
        "customers",
        "employees",
        "products",
        "sales_orders",
        "schema_version",
        "sqlite_sequence", // Auto-created by SQLite for AUTOINCREMENT columns
    ] {
        assert!(
            tables.contains(&expected.to_string()),
            "Missing table: {}",
            expected
        );
    }
}

#[test]
fn test_secondary_schema_has_no_autoincrement() {
    let mut conn = Connection::open_in_memory().unwrap();
    apply_migrations(&mut conn, Schema::Secondary).unwrap();

    let tables = get_table_names(&conn);
    assert!(!tables.contains(&"sqlite_sequence".to_string()));
    assert!(tables.contains(&"sales_orders".to_string()));

    // Identifiers must be supplied by the writer
    let err = conn.execute(
        "INSERT INTO products (name, category, price) VALUES ('a', 'b', 1.0)",
        [],
    );
    assert!(err.is_err());
}

#[test]
fn test_primary_order_date_defaults_to_utc_millis() {
    let mut conn = Connection::open_in_memory().unwrap();
    apply_migrations(&mut conn, Schema::Primary).unwrap();
    conn.execute_batch(
        "INSERT INTO products (name, category, price) VALUES ('Widget', 'Tools', 9.99);
         INSERT INTO employees (first_name, last_name, position, hire_date)
             VALUES ('Ada', 'Lovelace', 'Engineer', '2020-01-01');
         INSERT INTO sales_orders (product_id, quantity, employee_id, total_price)
             VALUES (1, 1, 1, 9.99);",
    )
    .unwrap();
    let date: String = conn
        .query_row("SELECT order_date FROM sales_orders", [], |r| r.get(0))
        .unwrap();
    assert_eq!(date.len(), "2026-01-01T00:00:00.000Z".len());
    assert!(date.ends_with('Z'));
}

#[test]
fn test_migrations_recorded_once() {
    let mut conn = Connection::open_in_memory().unwrap();
    apply_migrations(&mut conn, Schema::Primary).unwrap();
    apply_migrations(&mut conn, Schema::Primary).unwrap();
    assert_eq!(applied_migrations(&conn).unwrap().len(), 1);
}
