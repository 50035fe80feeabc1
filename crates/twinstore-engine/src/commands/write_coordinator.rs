//! Write coordination
//!
//! A mutation runs against the backend(s) its mode selects:
//!
//! - `primary`: one primary unit, committed on success.
//! - `secondary`: one retrying secondary transaction. New identifiers are
//!   allocated inside the callback, so a re-run allocates again.
//! - `dual`: the primary unit is opened and the mutation applied; the
//!   mirrored mutation then runs in the secondary transaction, carrying the
//!   primary's identifier; only once the secondary has committed is the
//!   primary committed. A secondary failure rolls the primary back.
//!
//! Deletes first clean up referencing rows in the same unit or callback.
//! A crash between the secondary commit and the primary commit leaves the
//! stores diverged; nothing here repairs that.

#![allow(clippy::result_large_err)]

use crate::commands::require_secondary;
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, warn};
use twinstore_core::cascade::plan_delete;
use twinstore_core::model::OnDelete;
use twinstore_core::reconcile::{self, Assigned};
use twinstore_core::{
    log_op_end, log_op_error, log_op_start, statements, BackendKind, ExError, ExErrorKind,
    FieldType, Mode, Mutation, MutationKind, PrimaryStore, PrimaryUnit, Result, SecondaryStore,
    SecondaryTxn,
};

/// Result of a coordinated write
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteOutcome {
    pub entity: &'static str,
    pub kind: MutationKind,
    pub mode: Mode,
    /// New identifier for creates, the caller's identifier otherwise
    pub id: i64,
    /// Rows touched by the main statement on the store of record
    pub affected: usize,
}

/// What one backend did with a mutation
#[derive(Debug, Clone)]
struct Applied {
    id: i64,
    affected: usize,
    assigned: Option<Assigned>,
}

pub struct WriteCoordinator<'a> {
    primary: &'a dyn PrimaryStore,
    secondary: Option<&'a dyn SecondaryStore>,
}

impl<'a> WriteCoordinator<'a> {
    pub fn new(primary: &'a dyn PrimaryStore, secondary: Option<&'a dyn SecondaryStore>) -> Self {
        Self { primary, secondary }
    }

    /// Apply `mutation` under `mode`.
    ///
    /// Updating or deleting an identifier that does not exist succeeds with
    /// `affected == 0`.
    ///
    /// # Errors
    ///
    /// - `Configuration`: the mode needs a secondary that is not available;
    ///   raised before any backend is touched
    /// - `Connection`: a backend handle could not be obtained
    /// - `BackendExecution`: a statement, commit or the secondary
    ///   transaction failed; in dual mode the primary has been rolled back
    pub fn write(&self, mutation: &Mutation, mode: Mode) -> Result<WriteOutcome> {
        let entity = mutation.entity().name;
        let kind = mutation.kind();
        log_op_start!(
            "write",
            entity = entity,
            mode = mode.as_str(),
            kind = kind.as_str(),
            entity_id = mutation.id()
        );
        let start = Instant::now();

        let result = self
            .write_impl(mutation, mode)
            .map_err(|e| annotate(e, mutation))
            .map_err(|e| {
                log_op_error!(
                    "write",
                    &e,
                    duration_ms = start.elapsed().as_millis() as u64,
                    entity = entity,
                    mode = mode.as_str(),
                    kind = kind.as_str()
                );
                e
            })?;

        log_op_end!(
            "write",
            duration_ms = start.elapsed().as_millis() as u64,
            entity = entity,
            mode = mode.as_str(),
            kind = kind.as_str(),
            entity_id = result.id,
            affected = result.affected as u64
        );

        Ok(result)
    }

    fn write_impl(&self, mutation: &Mutation, mode: Mode) -> Result<WriteOutcome> {
        let applied = match mode {
            Mode::Primary => self.write_primary(mutation)?,
            Mode::Secondary => {
                let secondary = require_secondary(self.secondary, mode, "write")?;
                secondary.run_in_transaction(|txn| apply_secondary(txn, mutation, None))?
            }
            Mode::Dual => {
                let secondary = require_secondary(self.secondary, mode, "write")?;
                self.write_dual(secondary, mutation)?
            }
        };
        Ok(WriteOutcome {
            entity: mutation.entity().name,
            kind: mutation.kind(),
            mode,
            id: applied.id,
            affected: applied.affected,
        })
    }

    fn write_primary(&self, mutation: &Mutation) -> Result<Applied> {
        let mut unit = self.primary.begin()?;
        match apply_primary(unit.as_mut(), mutation) {
            Ok(applied) => {
                unit.commit()?;
                Ok(applied)
            }
            Err(err) => {
                release(unit);
                Err(err)
            }
        }
    }

    fn write_dual(&self, secondary: &dyn SecondaryStore, mutation: &Mutation) -> Result<Applied> {
        let mut unit = self.primary.begin()?;

        let mirrored = apply_primary(unit.as_mut(), mutation).and_then(|applied| {
            let assigned = applied.assigned.as_ref();
            secondary.run_in_transaction(|txn| apply_secondary(txn, mutation, assigned))?;
            debug!(
                entity = mutation.entity().name,
                entity_id = applied.id,
                "secondary committed, committing primary"
            );
            Ok(applied)
        });

        match mirrored {
            Ok(applied) => {
                unit.commit()?;
                Ok(applied)
            }
            Err(err) => {
                release(unit);
                Err(err)
            }
        }
    }
}

/// Roll back a unit whose work failed; a failing rollback is only logged
fn release(unit: Box<dyn PrimaryUnit>) {
    if let Err(rb) = unit.rollback() {
        warn!(backend = %BackendKind::Primary, error = %rb, "rollback failed");
    }
}

/// Apply a mutation inside a primary unit
fn apply_primary(unit: &mut dyn PrimaryUnit, mutation: &Mutation) -> Result<Applied> {
    let entity = mutation.entity();
    match mutation.kind() {
        MutationKind::Create => {
            let rows = unit.query(
                &statements::primary_insert(entity, mutation.values()),
                &statements::returning_shape(entity),
            )?;
            let row = rows.into_iter().next().ok_or_else(|| {
                ExError::new(ExErrorKind::BackendExecution)
                    .with_op("insert")
                    .with_backend(BackendKind::Primary)
                    .with_message("insert returned no row")
            })?;
            let assigned = Assigned::from_returning(entity, row)?;
            Ok(Applied {
                id: assigned.id,
                affected: 1,
                assigned: Some(assigned),
            })
        }
        MutationKind::Update => {
            let id = mutation.require_id()?;
            let affected =
                unit.execute(&statements::primary_update(entity, id, mutation.values()))?;
            Ok(Applied {
                id,
                affected,
                assigned: None,
            })
        }
        MutationKind::Delete => {
            let id = mutation.require_id()?;
            for step in plan_delete(entity) {
                let stmt = match step.action {
                    OnDelete::Cascade => statements::primary_delete_where(step.child, step.column, id),
                    OnDelete::SetNull => {
                        statements::primary_set_null_where(step.child, step.column, id)
                    }
                };
                let touched = unit.execute(&stmt)?;
                debug!(child = step.child.name, touched = touched as u64, "referencing rows cleaned up");
            }
            let affected = unit.execute(&statements::primary_delete(entity, id))?;
            Ok(Applied {
                id,
                affected,
                assigned: None,
            })
        }
    }
}

/// Apply a mutation inside a secondary transaction callback.
///
/// `assigned` is the primary's assignment in dual mode. Without it a create
/// allocates `MAX(id) + 1` from what this attempt can see.
fn apply_secondary(
    txn: &mut dyn SecondaryTxn,
    mutation: &Mutation,
    assigned: Option<&Assigned>,
) -> Result<Applied> {
    let entity = mutation.entity();
    match mutation.kind() {
        MutationKind::Create => {
            let assigned = match assigned {
                Some(assigned) => assigned.clone(),
                None => {
                    let rows =
                        txn.execute_sql(&statements::secondary_max_id(entity), &[FieldType::Int64])?;
                    let max_id = rows
                        .first()
                        .and_then(|row| row.first())
                        .and_then(|v| v.as_i64());
                    Assigned::next(entity, max_id, txn.commit_timestamp())
                }
            };
            let affected = txn.execute_update(&reconcile::mirror(mutation, Some(&assigned))?)?;
            Ok(Applied {
                id: assigned.id,
                affected,
                assigned: Some(assigned),
            })
        }
        MutationKind::Update => {
            let id = mutation.require_id()?;
            let affected = txn.execute_update(&reconcile::mirror(mutation, None)?)?;
            Ok(Applied {
                id,
                affected,
                assigned: None,
            })
        }
        MutationKind::Delete => {
            let id = mutation.require_id()?;
            for step in plan_delete(entity) {
                match step.action {
                    OnDelete::Cascade => {
                        txn.execute_update(&statements::secondary_delete_where(
                            step.child,
                            step.column,
                            id,
                        ))?;
                    }
                    OnDelete::SetNull => {
                        let children = txn.execute_sql(
                            &statements::secondary_select_ids_where(step.child, step.column, id),
                            &[FieldType::Int64],
                        )?;
                        for child_id in children.iter().filter_map(|row| row.first()?.as_i64()) {
                            txn.execute_update(&statements::secondary_set_null_by_id(
                                step.child,
                                step.column,
                                child_id,
                            ))?;
                        }
                    }
                }
            }
            let affected = txn.execute_update(&reconcile::mirror(mutation, None)?)?;
            Ok(Applied {
                id,
                affected,
                assigned: None,
            })
        }
    }
}

/// Attach the mutation's entity and identifier to an error that lacks them
fn annotate(err: ExError, mutation: &Mutation) -> ExError {
    let err = if err.entity().is_none() {
        err.with_entity(mutation.entity().name)
    } else {
        err
    };
    match mutation.id() {
        Some(id) if err.entity_id().is_none() => err.with_entity_id(id),
        _ => err,
    }
}
