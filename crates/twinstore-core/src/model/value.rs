//! Column values and their typed bindings

use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Text encoding used for `DATE` columns
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Text encoding used for `TIMESTAMP` columns (UTC, millisecond precision)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Declared type of a column, doubling as the typed parameter binding the
/// secondary store requires for every statement parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    Int64,
    Float64,
    String,
    Date,
    Timestamp,
}

impl FieldType {
    /// Binding name as understood by the secondary store
    pub fn code(&self) -> &'static str {
        match self {
            FieldType::Int64 => "INT64",
            FieldType::Float64 => "FLOAT64",
            FieldType::String => "STRING",
            FieldType::Date => "DATE",
            FieldType::Timestamp => "TIMESTAMP",
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// A single column value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// Short type name used in validation messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Int(_) => "INT64",
            Value::Float(_) => "FLOAT64",
            Value::Text(_) => "STRING",
            Value::Date(_) => "DATE",
            Value::Timestamp(_) => "TIMESTAMP",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether this value may be bound to a parameter of type `ty`.
    /// `NULL` binds to every type.
    pub fn fits(&self, ty: FieldType) -> bool {
        matches!(
            (self, ty),
            (Value::Null, _)
                | (Value::Int(_), FieldType::Int64)
                | (Value::Float(_), FieldType::Float64)
                | (Value::Text(_), FieldType::String)
                | (Value::Date(_), FieldType::Date)
                | (Value::Timestamp(_), FieldType::Timestamp)
        )
    }

    /// Convert into the representation required by `ty`.
    ///
    /// Integers widen to floats; timestamps are truncated to millisecond
    /// precision so they survive a round trip through either store. Any
    /// other mismatch returns the value back unchanged as the error.
    pub fn coerce(self, ty: FieldType) -> std::result::Result<Value, Value> {
        match (self, ty) {
            (Value::Int(i), FieldType::Float64) => Ok(Value::Float(i as f64)),
            (Value::Timestamp(ts), FieldType::Timestamp) => {
                Ok(Value::Timestamp(ts.trunc_subsecs(3)))
            }
            (v, ty) if v.fits(ty) => Ok(v),
            (v, _) => Err(v),
        }
    }

    /// Decode a raw string (as submitted by a form) into a value of type `ty`.
    ///
    /// An empty string decodes to `NULL`; whether `NULL` is acceptable is the
    /// caller's decision.
    pub fn parse(ty: FieldType, raw: &str) -> std::result::Result<Value, String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Value::Null);
        }
        match ty {
            FieldType::Int64 => raw
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|e| format!("'{}' is not an integer: {}", raw, e)),
            FieldType::Float64 => raw
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Value::Float)
                .ok_or_else(|| format!("'{}' is not a finite number", raw)),
            FieldType::String => Ok(Value::Text(raw.to_string())),
            FieldType::Date => NaiveDate::parse_from_str(raw, DATE_FORMAT)
                .map(Value::Date)
                .map_err(|e| format!("'{}' is not a YYYY-MM-DD date: {}", raw, e)),
            FieldType::Timestamp => parse_timestamp(raw).map(Value::Timestamp),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Value::Timestamp(ts) => f.write_str(&format_timestamp(ts)),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Render a timestamp in the canonical column encoding
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse an RFC 3339 timestamp, normalising to UTC millisecond precision
pub fn parse_timestamp(raw: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|ts| ts.with_timezone(&Utc).trunc_subsecs(3))
        .map_err(|e| format!("'{}' is not an RFC 3339 timestamp: {}", raw, e))
}
