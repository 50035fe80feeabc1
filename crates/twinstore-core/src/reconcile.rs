//! Identifier reconciliation
//!
//! The primary assigns identifiers (and generated columns) on insert; the
//! secondary assigns nothing. Whatever the store of record produced is
//! carried into the mirrored secondary insert so both rows are equal.

use crate::backend::{BackendKind, Row, TypedParam, TypedStatement};
use crate::errors::{ExError, ExErrorKind, Result};
use crate::model::{EntitySpec, Generated, Mutation, MutationKind, Value};
use crate::statements;
use chrono::{DateTime, SubsecRound, Utc};

/// Identifier and generated column values assigned to a new row
#[derive(Debug, Clone, PartialEq)]
pub struct Assigned {
    pub id: i64,
    pub generated: Vec<(&'static str, Value)>,
}

impl Assigned {
    /// Decode the row returned by a primary insert (`id, generated...`)
    pub fn from_returning(entity: &'static EntitySpec, row: Row) -> Result<Self> {
        let mut values = row.into_iter();
        let id = values.next().and_then(|v| v.as_i64()).ok_or_else(|| {
            ExError::new(ExErrorKind::Internal)
                .with_op("reconcile")
                .with_backend(BackendKind::Primary)
                .with_entity(entity.name)
                .with_message("insert did not return an identifier")
        })?;
        let generated: Vec<_> = entity
            .generated_fields()
            .map(|f| (f.name, values.next().unwrap_or(Value::Null)))
            .collect();
        if let Some((name, _)) = generated.iter().find(|(_, v)| v.is_null()) {
            return Err(ExError::new(ExErrorKind::Internal)
                .with_op("reconcile")
                .with_backend(BackendKind::Primary)
                .with_entity(entity.name)
                .with_entity_id(id)
                .with_message(format!("insert did not return generated column '{}'", name)));
        }
        Ok(Self { id, generated })
    }

    /// Allocate the next identifier on a store that does not generate them.
    ///
    /// `max_id` is the current highest identifier (`None` for an empty
    /// table); generated columns take the transaction's commit timestamp.
    pub fn next(entity: &'static EntitySpec, max_id: Option<i64>, commit_ts: DateTime<Utc>) -> Self {
        let generated = entity
            .generated_fields()
            .map(|f| match f.generated {
                Some(Generated::CommitTimestamp) | None => {
                    (f.name, Value::Timestamp(commit_ts.trunc_subsecs(3)))
                }
            })
            .collect();
        Self {
            id: max_id.unwrap_or(0) + 1,
            generated,
        }
    }

    pub fn generated(&self, field: &str) -> Option<&Value> {
        self.generated
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, v)| v)
    }
}

/// Secondary insert parameters for a create, with the assigned identifier
/// and generated values forced in
pub fn insert_params(mutation: &Mutation, assigned: &Assigned) -> Result<Vec<TypedParam>> {
    let entity = mutation.entity();
    let mut writable = mutation.values().iter();
    let mut params = vec![TypedParam::new(
        entity.id_column,
        Value::Int(assigned.id),
        crate::model::FieldType::Int64,
    )];
    for field in entity.fields {
        let value = if field.is_writable() {
            writable.next().cloned().unwrap_or(Value::Null)
        } else {
            assigned.generated(field.name).cloned().ok_or_else(|| {
                ExError::new(ExErrorKind::Internal)
                    .with_op("reconcile")
                    .with_entity(entity.name)
                    .with_entity_id(assigned.id)
                    .with_message(format!("no value assigned for '{}'", field.name))
            })?
        };
        params.push(TypedParam::new(field.name, value, field.ty));
    }
    Ok(params)
}

/// The secondary statement mirroring `mutation`.
///
/// Creates need the identifier the store of record assigned; updates and
/// deletes pass through with the caller's identifier.
pub fn mirror(mutation: &Mutation, assigned: Option<&Assigned>) -> Result<TypedStatement> {
    let entity = mutation.entity();
    match mutation.kind() {
        MutationKind::Create => {
            let assigned = assigned.ok_or_else(|| {
                ExError::new(ExErrorKind::Internal)
                    .with_op("reconcile")
                    .with_entity(entity.name)
                    .with_message("create mirrored without an assigned identifier")
            })?;
            Ok(statements::secondary_insert(
                entity,
                insert_params(mutation, assigned)?,
            ))
        }
        MutationKind::Update => Ok(statements::secondary_update(
            entity,
            mutation.require_id()?,
            mutation.values(),
        )),
        MutationKind::Delete => Ok(statements::secondary_delete(entity, mutation.require_id()?)),
    }
}
