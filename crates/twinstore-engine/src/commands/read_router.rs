//! Read routing
//!
//! Every read is served by exactly one backend: the primary in `primary`
//! and `dual` modes, the secondary's snapshot API in `secondary` mode.
//! Both return records in the catalog's column order.

#![allow(clippy::result_large_err)]

use crate::commands::require_secondary;
use std::time::Instant;
use twinstore_core::model::catalog;
use twinstore_core::{
    log_op_end, log_op_error, log_op_start, statements, BackendKind, EntitySpec, Lookup, Mode,
    OrderSummary, PrimaryStore, Record, Result, Row, SecondaryStore,
};

pub struct ReadRouter<'a> {
    primary: &'a dyn PrimaryStore,
    secondary: Option<&'a dyn SecondaryStore>,
}

impl<'a> ReadRouter<'a> {
    pub fn new(primary: &'a dyn PrimaryStore, secondary: Option<&'a dyn SecondaryStore>) -> Self {
        Self { primary, secondary }
    }

    /// All records of `entity`, ordered by identifier ascending
    ///
    /// # Errors
    ///
    /// `UnknownEntity`, `Configuration` (secondary mode without a secondary),
    /// `Connection` or `BackendExecution`.
    pub fn read_all(&self, entity: &str, mode: Mode) -> Result<Vec<Record>> {
        log_op_start!("read_all", entity = entity, mode = mode.as_str());
        let start = Instant::now();

        let result = self.read_all_impl(entity, mode).map_err(|e| {
            log_op_error!(
                "read_all",
                &e,
                duration_ms = start.elapsed().as_millis() as u64,
                entity = entity
            );
            e
        })?;

        log_op_end!(
            "read_all",
            duration_ms = start.elapsed().as_millis() as u64,
            entity = entity,
            rows = result.len() as u64
        );
        Ok(result)
    }

    /// One record by identifier; absence is `Lookup::NotFound`, not an error
    ///
    /// # Errors
    ///
    /// As for [`ReadRouter::read_all`].
    pub fn read_one(&self, entity: &str, id: i64, mode: Mode) -> Result<Lookup> {
        log_op_start!("read_one", entity = entity, entity_id = id, mode = mode.as_str());
        let start = Instant::now();

        let result = self.read_one_impl(entity, id, mode).map_err(|e| {
            log_op_error!(
                "read_one",
                &e,
                duration_ms = start.elapsed().as_millis() as u64,
                entity = entity,
                entity_id = id
            );
            e
        })?;

        log_op_end!(
            "read_one",
            duration_ms = start.elapsed().as_millis() as u64,
            entity = entity,
            entity_id = id,
            found = result.is_found()
        );
        Ok(result)
    }

    /// Sales orders with product, employee and customer names, newest first
    ///
    /// # Errors
    ///
    /// As for [`ReadRouter::read_all`].
    pub fn order_report(&self, mode: Mode) -> Result<Vec<OrderSummary>> {
        log_op_start!("order_report", mode = mode.as_str());
        let start = Instant::now();

        let result = self.order_report_impl(mode).map_err(|e| {
            log_op_error!(
                "order_report",
                &e,
                duration_ms = start.elapsed().as_millis() as u64
            );
            e
        })?;

        log_op_end!(
            "order_report",
            duration_ms = start.elapsed().as_millis() as u64,
            rows = result.len() as u64
        );
        Ok(result)
    }

    fn read_all_impl(&self, entity: &str, mode: Mode) -> Result<Vec<Record>> {
        let spec = catalog::entity(entity)?;
        let rows = match mode.read_backend() {
            BackendKind::Primary => self
                .primary
                .read(&statements::primary_select_all(spec), &spec.shape())?,
            BackendKind::Secondary => require_secondary(self.secondary, mode, "read_all")?
                .snapshot(&statements::secondary_select_all(spec), &spec.shape())?,
        };
        to_records(spec, rows)
    }

    fn read_one_impl(&self, entity: &str, id: i64, mode: Mode) -> Result<Lookup> {
        let spec = catalog::entity(entity)?;
        let rows = match mode.read_backend() {
            BackendKind::Primary => self
                .primary
                .read(&statements::primary_select_one(spec, id), &spec.shape())?,
            BackendKind::Secondary => require_secondary(self.secondary, mode, "read_one")?
                .snapshot(&statements::secondary_select_one(spec, id), &spec.shape())?,
        };
        let record = rows
            .into_iter()
            .next()
            .map(|row| Record::from_row(spec, row))
            .transpose()?;
        Ok(Lookup::from(record))
    }

    fn order_report_impl(&self, mode: Mode) -> Result<Vec<OrderSummary>> {
        let rows = match mode.read_backend() {
            BackendKind::Primary => self
                .primary
                .read(&statements::primary_order_report(), &OrderSummary::SHAPE)?,
            BackendKind::Secondary => require_secondary(self.secondary, mode, "order_report")?
                .snapshot(&statements::secondary_order_report(), &OrderSummary::SHAPE)?,
        };
        rows.into_iter().map(OrderSummary::from_row).collect()
    }
}

fn to_records(spec: &'static EntitySpec, rows: Vec<Row>) -> Result<Vec<Record>> {
    rows.into_iter()
        .map(|row| Record::from_row(spec, row))
        .collect()
}
