//! Conversion between catalog values and SQLite storage classes
//!
//! Dates and timestamps are stored as text in their canonical encodings,
//! so ordering by a timestamp column is chronological.

use crate::errors::{decode_error, from_rusqlite, Result};
use rusqlite::types::{Value as SqlValue, ValueRef};
use twinstore_core::model::value::{format_timestamp, DATE_FORMAT};
use twinstore_core::{BackendKind, FieldType, Row, Value};

pub fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Int(i) => SqlValue::Integer(*i),
        Value::Float(f) => SqlValue::Real(*f),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Date(d) => SqlValue::Text(d.format(DATE_FORMAT).to_string()),
        Value::Timestamp(ts) => SqlValue::Text(format_timestamp(ts)),
    }
}

/// Decode one column into the declared type
pub fn from_sql(ty: FieldType, raw: ValueRef<'_>) -> std::result::Result<Value, String> {
    match (ty, raw) {
        (_, ValueRef::Null) => Ok(Value::Null),
        (FieldType::Int64, ValueRef::Integer(i)) => Ok(Value::Int(i)),
        (FieldType::Float64, ValueRef::Real(f)) => Ok(Value::Float(f)),
        (FieldType::Float64, ValueRef::Integer(i)) => Ok(Value::Float(i as f64)),
        (FieldType::String, ValueRef::Text(t)) => std::str::from_utf8(t)
            .map(|s| Value::Text(s.to_string()))
            .map_err(|e| e.to_string()),
        (FieldType::Date, ValueRef::Text(t)) | (FieldType::Timestamp, ValueRef::Text(t)) => {
            let text = std::str::from_utf8(t).map_err(|e| e.to_string())?;
            Value::parse(ty, text)
        }
        (ty, other) => Err(format!(
            "expected {}, found storage class {:?}",
            ty,
            other.data_type()
        )),
    }
}

/// Decode a result row against `shape`
pub fn decode_row(backend: BackendKind, row: &rusqlite::Row<'_>, shape: &[FieldType]) -> Result<Row> {
    shape
        .iter()
        .enumerate()
        .map(|(i, ty)| {
            let raw = row.get_ref(i).map_err(|e| from_rusqlite(backend, e))?;
            from_sql(*ty, raw).map_err(|reason| decode_error(backend, i, &reason))
        })
        .collect()
}

/// Run a prepared query and decode every row
pub fn collect_rows<P: rusqlite::Params>(
    backend: BackendKind,
    stmt: &mut rusqlite::Statement<'_>,
    params: P,
    shape: &[FieldType],
) -> Result<Vec<Row>> {
    let mut rows = stmt.query(params).map_err(|e| from_rusqlite(backend, e))?;
    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(|e| from_rusqlite(backend, e))? {
        out.push(decode_row(backend, row, shape)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    #[test]
    fn test_dates_stored_as_text() {
        let d = NaiveDate::from_ymd_opt(2021, 6, 30).unwrap();
        assert_eq!(
            to_sql(&Value::Date(d)),
            SqlValue::Text("2021-06-30".to_string())
        );
        assert_eq!(
            from_sql(FieldType::Date, ValueRef::Text(b"2021-06-30")),
            Ok(Value::Date(d))
        );
    }

    #[test]
    fn test_timestamp_text_decodes() {
        let ts = Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 0).unwrap();
        let stored = to_sql(&Value::Timestamp(ts));
        assert_eq!(
            stored,
            SqlValue::Text("2026-10-16T09:30:00.000Z".to_string())
        );
        assert_eq!(
            from_sql(
                FieldType::Timestamp,
                ValueRef::Text(b"2026-10-16T09:30:00.000Z")
            ),
            Ok(Value::Timestamp(ts))
        );
    }

    #[test]
    fn test_integer_real_widening_only() {
        assert_eq!(
            from_sql(FieldType::Float64, ValueRef::Integer(3)),
            Ok(Value::Float(3.0))
        );
        assert!(from_sql(FieldType::Int64, ValueRef::Real(3.5)).is_err());
        assert_eq!(from_sql(FieldType::String, ValueRef::Null), Ok(Value::Null));
    }
}
