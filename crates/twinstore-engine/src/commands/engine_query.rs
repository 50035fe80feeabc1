//! Engine-level read-only query surface.
//!
//! `apply_engine_query` is the single entry point for reads; it never
//! writes to either store.

#![allow(clippy::result_large_err)]

use crate::commands::read_router::ReadRouter;
use serde::Serialize;
use twinstore_core::{Lookup, Mode, OrderSummary, Record, Result};

/// Read-only queries supported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineQuery {
    /// Every record of an entity, by identifier ascending
    ReadAll { entity: String },
    /// One record by identifier
    ReadOne { entity: String, id: i64 },
    /// The sales-order report, newest first
    OrderReport,
}

/// Result of an engine query
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EngineQueryResult {
    Records(Vec<Record>),
    Record(Option<Record>),
    Orders(Vec<OrderSummary>),
}

/// Run `query` against the backend `mode` reads from.
///
/// # Errors
///
/// Whatever the router reports for the query.
pub fn apply_engine_query(
    router: &ReadRouter<'_>,
    query: &EngineQuery,
    mode: Mode,
) -> Result<EngineQueryResult> {
    match query {
        EngineQuery::ReadAll { entity } => router
            .read_all(entity, mode)
            .map(EngineQueryResult::Records),
        EngineQuery::ReadOne { entity, id } => {
            router.read_one(entity, *id, mode).map(|lookup| match lookup {
                Lookup::Found(record) => EngineQueryResult::Record(Some(record)),
                Lookup::NotFound => EngineQueryResult::Record(None),
            })
        }
        EngineQuery::OrderReport => router.order_report(mode).map(EngineQueryResult::Orders),
    }
}
