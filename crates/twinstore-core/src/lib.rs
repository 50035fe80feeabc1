//! twinstore core - dual-write coordination kernel
//!
//! This crate holds everything the coordinator needs that does not touch a
//! driver:
//! - the entity catalog, values, records and validated mutations
//! - mode selection (primary / secondary / dual)
//! - backend capability traits for the primary and secondary stores
//! - SQL builders for both store dialects
//! - identifier reconciliation and referential cleanup planning
//! - the error and logging facilities shared by every crate

pub mod backend;
pub mod cascade;
pub mod errors;
pub mod logging_facility;
pub mod mode;
pub mod model;
pub mod reconcile;
pub mod statements;

pub use twinstore_core_types as core_types;

// Re-export commonly used types
pub use backend::{
    BackendKind, PrimaryStore, PrimaryUnit, Row, SecondaryStore, SecondaryTxn, Statement,
    TypedParam, TypedStatement,
};
pub use errors::{ExError, ExErrorKind, ModelError, Result};
pub use mode::{Mode, ModeContext, SessionModes};
pub use model::{
    EntitySpec, FieldType, Lookup, Mutation, MutationKind, OrderSummary, Record, Value,
};
pub use reconcile::Assigned;
