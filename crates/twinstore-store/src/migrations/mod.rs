//! Migration framework
//!
//! Provides:
//! - Migration runner with checksums and idempotent application
//! - Separate embedded migration sets for the primary and secondary schemas

mod checksums;
mod embedded;
mod runner;

pub use embedded::Schema;
pub use runner::{applied_migrations, apply_migrations};
