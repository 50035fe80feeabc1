//! Validated mutations
//!
//! A [`Mutation`] can only be built through the constructors below, which
//! check the request against the catalog. Backends therefore never see an
//! unknown field, a missing required value or a value of the wrong type.

use crate::errors::ModelError;
use crate::model::catalog::{self, EntitySpec, FieldSpec};
use crate::model::Value;
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::Create => "create",
            MutationKind::Update => "update",
            MutationKind::Delete => "delete",
        }
    }
}

impl std::fmt::Display for MutationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MutationKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" | "insert" | "add" => Ok(MutationKind::Create),
            "update" | "edit" => Ok(MutationKind::Update),
            "delete" | "remove" => Ok(MutationKind::Delete),
            _ => Err(ModelError::UnknownOperation {
                value: s.to_string(),
            }),
        }
    }
}

/// A request to create, update or delete one entity instance
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    entity: &'static EntitySpec,
    kind: MutationKind,
    /// Writable field values in catalog order; empty for deletes
    values: Vec<Value>,
    id: Option<i64>,
}

impl Mutation {
    /// Build a create; every writable field must be supplied unless nullable
    pub fn create<I, K>(entity: &str, fields: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let spec = catalog::entity(entity)?;
        let values = bind_fields(spec, fields)?;
        Ok(Self {
            entity: spec,
            kind: MutationKind::Create,
            values,
            id: None,
        })
    }

    /// Build a full-row update of the record with identifier `id`
    pub fn update<I, K>(entity: &str, id: i64, fields: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let spec = catalog::entity(entity)?;
        let values = bind_fields(spec, fields)?;
        Ok(Self {
            entity: spec,
            kind: MutationKind::Update,
            values,
            id: Some(id),
        })
    }

    /// Build a delete of the record with identifier `id`
    pub fn delete(entity: &str, id: i64) -> Result<Self, ModelError> {
        let spec = catalog::entity(entity)?;
        Ok(Self {
            entity: spec,
            kind: MutationKind::Delete,
            values: Vec::new(),
            id: Some(id),
        })
    }

    pub fn entity(&self) -> &'static EntitySpec {
        self.entity
    }

    pub fn kind(&self) -> MutationKind {
        self.kind
    }

    /// Caller-supplied identifier (update/delete only)
    pub fn id(&self) -> Option<i64> {
        self.id
    }

    /// Identifier for update/delete; creates have none until a store assigns one
    pub fn require_id(&self) -> Result<i64, ModelError> {
        self.id.ok_or_else(|| ModelError::MissingIdentifier {
            entity: self.entity.name.to_string(),
        })
    }

    /// Writable field values in catalog order
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// (field, value) pairs for the writable fields
    pub fn fields(&self) -> impl Iterator<Item = (&'static FieldSpec, &Value)> {
        self.entity.writable_fields().zip(self.values.iter())
    }

    /// Value of one writable field
    pub fn value(&self, field: &str) -> Option<&Value> {
        self.fields().find(|(f, _)| f.name == field).map(|(_, v)| v)
    }
}

fn bind_fields<I, K>(spec: &'static EntitySpec, fields: I) -> Result<Vec<Value>, ModelError>
where
    I: IntoIterator<Item = (K, Value)>,
    K: AsRef<str>,
{
    let mut supplied: BTreeMap<&'static str, Value> = BTreeMap::new();
    for (name, value) in fields {
        let name = name.as_ref();
        if name == spec.id_column {
            return Err(ModelError::UnexpectedIdentifier {
                entity: spec.name.to_string(),
            });
        }
        let field = spec.field(name).ok_or_else(|| ModelError::UnknownField {
            entity: spec.name.to_string(),
            field: name.to_string(),
        })?;
        if !field.is_writable() {
            return Err(ModelError::GeneratedField {
                entity: spec.name.to_string(),
                field: field.name.to_string(),
            });
        }
        supplied.insert(field.name, value);
    }

    spec.writable_fields()
        .map(|field| {
            let value = supplied.remove(field.name).unwrap_or(Value::Null);
            if value.is_null() {
                return if field.nullable {
                    Ok(Value::Null)
                } else {
                    Err(ModelError::MissingField {
                        entity: spec.name.to_string(),
                        field: field.name.to_string(),
                    })
                };
            }
            value
                .coerce(field.ty)
                .map_err(|found| ModelError::TypeMismatch {
                    entity: spec.name.to_string(),
                    field: field.name.to_string(),
                    expected: field.ty,
                    found: found.type_name(),
                })
        })
        .collect()
}
