//! Data model: values, the entity catalog, mutations and read results

pub mod catalog;
pub mod mutation;
pub mod record;
pub mod value;

pub use catalog::{EntitySpec, FieldSpec, Generated, OnDelete, Reference};
pub use mutation::{Mutation, MutationKind};
pub use record::{Lookup, OrderSummary, Record};
pub use value::{FieldType, Value};
