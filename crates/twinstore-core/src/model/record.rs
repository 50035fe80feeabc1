//! Normalised read results

use crate::errors::{ExError, ExErrorKind, Result};
use crate::model::{EntitySpec, FieldType, Value};
use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// One row of an entity in canonical column order (identifier first)
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    entity: &'static EntitySpec,
    values: Vec<Value>,
}

impl Record {
    /// Wrap a backend row, checking it has the entity's shape
    pub fn from_row(entity: &'static EntitySpec, values: Vec<Value>) -> Result<Self> {
        let shape = entity.shape();
        if values.len() != shape.len() {
            return Err(ExError::new(ExErrorKind::Internal)
                .with_entity(entity.name)
                .with_message(format!(
                    "row has {} columns, entity has {}",
                    values.len(),
                    shape.len()
                )));
        }
        if let Some((col, v)) = entity
            .columns()
            .into_iter()
            .zip(values.iter())
            .zip(shape)
            .find(|((_, v), ty)| !v.fits(*ty))
            .map(|((col, v), _)| (col, v))
        {
            return Err(ExError::new(ExErrorKind::Internal)
                .with_entity(entity.name)
                .with_message(format!(
                    "column '{}' returned a {} value",
                    col,
                    v.type_name()
                )));
        }
        Ok(Self { entity, values })
    }

    pub fn entity(&self) -> &'static EntitySpec {
        self.entity
    }

    pub fn id(&self) -> Option<i64> {
        self.values.first().and_then(Value::as_i64)
    }

    /// Value of a column by name
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.entity
            .position(column)
            .and_then(|p| self.values.get(p))
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let columns = self.entity.columns();
        let mut map = serializer.serialize_map(Some(columns.len()))?;
        for (col, v) in columns.iter().zip(self.values.iter()) {
            map.serialize_entry(col, v)?;
        }
        map.end()
    }
}

/// Result of a single-record read; absence is a normal outcome
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(Record),
    NotFound,
}

impl Lookup {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn found(self) -> Option<Record> {
        match self {
            Lookup::Found(r) => Some(r),
            Lookup::NotFound => None,
        }
    }
}

impl From<Option<Record>> for Lookup {
    fn from(r: Option<Record>) -> Self {
        r.map(Lookup::Found).unwrap_or(Lookup::NotFound)
    }
}

/// One line of the sales-order report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderSummary {
    pub order_id: i64,
    pub product_name: String,
    pub employee_name: String,
    pub customer_name: Option<String>,
    pub quantity: i64,
    pub total_price: f64,
    pub order_date: DateTime<Utc>,
}

impl OrderSummary {
    /// Column types of the report query, in select order
    pub const SHAPE: [FieldType; 7] = [
        FieldType::Int64,
        FieldType::String,
        FieldType::String,
        FieldType::String,
        FieldType::Int64,
        FieldType::Float64,
        FieldType::Timestamp,
    ];

    pub fn from_row(row: Vec<Value>) -> Result<Self> {
        let malformed = |what: &str| {
            ExError::new(ExErrorKind::Internal)
                .with_op("order_report")
                .with_message(format!("report row has no usable {}", what))
        };
        let mut it = row.into_iter();
        let mut next = || it.next().unwrap_or(Value::Null);

        let order_id = next().as_i64().ok_or_else(|| malformed("order_id"))?;
        let product_name = text(next()).ok_or_else(|| malformed("product_name"))?;
        let employee_name = text(next()).ok_or_else(|| malformed("employee_name"))?;
        let customer_name = text(next());
        let quantity = next().as_i64().ok_or_else(|| malformed("quantity"))?;
        let total_price = next().as_f64().ok_or_else(|| malformed("total_price"))?;
        let order_date = next()
            .as_timestamp()
            .ok_or_else(|| malformed("order_date"))?;

        Ok(Self {
            order_id,
            product_name,
            employee_name,
            customer_name,
            quantity,
            total_price,
            order_date,
        })
    }
}

fn text(v: Value) -> Option<String> {
    match v {
        Value::Text(s) => Some(s),
        _ => None,
    }
}
