//! SQL for both store dialects
//!
//! Primary statements use positional `?N` parameters and let the store
//! assign identifiers (`RETURNING`). Secondary statements use named `@name`
//! parameters with explicit type bindings and always carry the identifier.
//! Every select lists columns explicitly so both stores return the same
//! record shape.

use crate::backend::{Statement, TypedParam, TypedStatement};
use crate::model::{EntitySpec, FieldType, Value};

fn column_list(entity: &EntitySpec) -> String {
    entity.columns().join(", ")
}

fn writable_columns(entity: &EntitySpec) -> Vec<&'static str> {
    entity.writable_fields().map(|f| f.name).collect()
}

fn id_param(value: i64) -> TypedParam {
    TypedParam::new("id", Value::Int(value), FieldType::Int64)
}

// ---------- primary ----------

/// All records ordered by identifier ascending
pub fn primary_select_all(entity: &EntitySpec) -> Statement {
    Statement::new(
        format!(
            "SELECT {} FROM {} ORDER BY {} ASC",
            column_list(entity),
            entity.table,
            entity.id_column
        ),
        vec![],
    )
}

pub fn primary_select_one(entity: &EntitySpec, id: i64) -> Statement {
    Statement::new(
        format!(
            "SELECT {} FROM {} WHERE {} = ?1",
            column_list(entity),
            entity.table,
            entity.id_column
        ),
        vec![Value::Int(id)],
    )
}

/// Insert the writable fields and return the assigned identifier followed
/// by every generated column, see [`returning_shape`]
pub fn primary_insert(entity: &EntitySpec, values: &[Value]) -> Statement {
    let cols = writable_columns(entity);
    let placeholders: Vec<String> = (1..=cols.len()).map(|i| format!("?{}", i)).collect();
    let returning: Vec<&str> = std::iter::once(entity.id_column)
        .chain(entity.generated_fields().map(|f| f.name))
        .collect();
    Statement::new(
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            entity.table,
            cols.join(", "),
            placeholders.join(", "),
            returning.join(", ")
        ),
        values.to_vec(),
    )
}

/// Shape of the row returned by [`primary_insert`]
pub fn returning_shape(entity: &EntitySpec) -> Vec<FieldType> {
    std::iter::once(FieldType::Int64)
        .chain(entity.generated_fields().map(|f| f.ty))
        .collect()
}

/// Full-row update of the writable fields
pub fn primary_update(entity: &EntitySpec, id: i64, values: &[Value]) -> Statement {
    let cols = writable_columns(entity);
    let assignments: Vec<String> = cols
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{} = ?{}", c, i + 1))
        .collect();
    let mut params = values.to_vec();
    params.push(Value::Int(id));
    Statement::new(
        format!(
            "UPDATE {} SET {} WHERE {} = ?{}",
            entity.table,
            assignments.join(", "),
            entity.id_column,
            cols.len() + 1
        ),
        params,
    )
}

pub fn primary_delete(entity: &EntitySpec, id: i64) -> Statement {
    Statement::new(
        format!("DELETE FROM {} WHERE {} = ?1", entity.table, entity.id_column),
        vec![Value::Int(id)],
    )
}

/// Delete every `child` row whose `column` references `parent_id`
pub fn primary_delete_where(child: &EntitySpec, column: &str, parent_id: i64) -> Statement {
    Statement::new(
        format!("DELETE FROM {} WHERE {} = ?1", child.table, column),
        vec![Value::Int(parent_id)],
    )
}

/// Clear `column` on every `child` row referencing `parent_id`
pub fn primary_set_null_where(child: &EntitySpec, column: &str, parent_id: i64) -> Statement {
    Statement::new(
        format!(
            "UPDATE {} SET {} = NULL WHERE {} = ?1",
            child.table, column, column
        ),
        vec![Value::Int(parent_id)],
    )
}

// ---------- secondary ----------

pub fn secondary_select_all(entity: &EntitySpec) -> TypedStatement {
    TypedStatement::new(
        format!(
            "SELECT {} FROM {} ORDER BY {} ASC",
            column_list(entity),
            entity.table,
            entity.id_column
        ),
        vec![],
    )
}

pub fn secondary_select_one(entity: &EntitySpec, id: i64) -> TypedStatement {
    TypedStatement::new(
        format!(
            "SELECT {} FROM {} WHERE {} = @id",
            column_list(entity),
            entity.table,
            entity.id_column
        ),
        vec![id_param(id)],
    )
}

/// Highest identifier in use; a single `NULL` column when the table is empty
pub fn secondary_max_id(entity: &EntitySpec) -> TypedStatement {
    TypedStatement::new(
        format!("SELECT MAX({}) FROM {}", entity.id_column, entity.table),
        vec![],
    )
}

/// Insert a complete row; `params` must name every column
pub fn secondary_insert(entity: &EntitySpec, params: Vec<TypedParam>) -> TypedStatement {
    let names: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
    let placeholders: Vec<String> = names.iter().map(|n| format!("@{}", n)).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        entity.table,
        names.join(", "),
        placeholders.join(", ")
    );
    TypedStatement::new(sql, params)
}

pub fn secondary_update(entity: &EntitySpec, id: i64, values: &[Value]) -> TypedStatement {
    let fields: Vec<_> = entity.writable_fields().collect();
    let assignments: Vec<String> = fields
        .iter()
        .map(|f| format!("{} = @{}", f.name, f.name))
        .collect();
    let mut params: Vec<TypedParam> = fields
        .iter()
        .zip(values.iter())
        .map(|(f, v)| TypedParam::new(f.name, v.clone(), f.ty))
        .collect();
    params.push(id_param(id));
    TypedStatement::new(
        format!(
            "UPDATE {} SET {} WHERE {} = @id",
            entity.table,
            assignments.join(", "),
            entity.id_column
        ),
        params,
    )
}

pub fn secondary_delete(entity: &EntitySpec, id: i64) -> TypedStatement {
    TypedStatement::new(
        format!("DELETE FROM {} WHERE {} = @id", entity.table, entity.id_column),
        vec![id_param(id)],
    )
}

pub fn secondary_delete_where(child: &EntitySpec, column: &str, parent_id: i64) -> TypedStatement {
    TypedStatement::new(
        format!("DELETE FROM {} WHERE {} = @id", child.table, column),
        vec![id_param(parent_id)],
    )
}

/// Identifiers of the `child` rows referencing `parent_id`
pub fn secondary_select_ids_where(
    child: &EntitySpec,
    column: &str,
    parent_id: i64,
) -> TypedStatement {
    TypedStatement::new(
        format!(
            "SELECT {} FROM {} WHERE {} = @id",
            child.id_column, child.table, column
        ),
        vec![id_param(parent_id)],
    )
}

/// Clear `column` on a single `child` row
pub fn secondary_set_null_by_id(child: &EntitySpec, column: &str, child_id: i64) -> TypedStatement {
    TypedStatement::new(
        format!(
            "UPDATE {} SET {} = NULL WHERE {} = @id",
            child.table, column, child.id_column
        ),
        vec![id_param(child_id)],
    )
}

// ---------- report ----------

const ORDER_REPORT_SQL: &str = "\
SELECT so.order_id, p.name, e.first_name, c.first_name, so.quantity, so.total_price, so.order_date \
FROM sales_orders so \
JOIN products p ON so.product_id = p.product_id \
JOIN employees e ON so.employee_id = e.employee_id \
LEFT JOIN customers c ON so.customer_id = c.customer_id \
ORDER BY so.order_date DESC, so.order_id DESC";

/// Sales orders joined with their product, employee and (optional) customer
pub fn primary_order_report() -> Statement {
    Statement::new(ORDER_REPORT_SQL, vec![])
}

pub fn secondary_order_report() -> TypedStatement {
    TypedStatement::new(ORDER_REPORT_SQL, vec![])
}
