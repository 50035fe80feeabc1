//! Command orchestration layer.
//!
//! ## Logging Ownership
//!
//! The engine owns lifecycle logging for every read and write:
//! `log_op_start!` at entry, `log_op_end!` on success, `log_op_error!` on
//! failure. Adapters below it only emit `debug!`/`warn!` details.

pub mod engine_command;
pub mod engine_query;
pub mod inbound;
pub mod read_router;
pub mod write_coordinator;

use twinstore_core::{ExError, ExErrorKind, Mode, SecondaryStore};

/// The secondary store, or a configuration error if `mode` needs one that
/// is not available
pub(crate) fn require_secondary<'a>(
    secondary: Option<&'a dyn SecondaryStore>,
    mode: Mode,
    op: &str,
) -> Result<&'a dyn SecondaryStore, ExError> {
    secondary.ok_or_else(|| {
        ExError::new(ExErrorKind::Configuration)
            .with_op(op)
            .with_message(format!(
                "mode '{}' requires the secondary store, which is not configured or not reachable",
                mode
            ))
    })
}
