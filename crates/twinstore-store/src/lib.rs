//! twinstore store - SQLite adapters for both backend capabilities
//!
//! Provides:
//! - The primary adapter (relational, store-assigned identifiers)
//! - The secondary adapter (typed bindings, retrying transactions)
//! - Schema migrations for both stores
//! - Backend configuration and lifecycle

pub mod backends;
pub mod codec;
pub mod config;
pub mod db;
pub mod errors;
pub mod migrations;
pub mod primary;
pub mod secondary;

// Re-export key types
pub use backends::Backends;
pub use config::{BackendConfig, PrimaryConfig, RetryPolicy, SecondaryConfig};
pub use errors::Result;
pub use primary::SqlitePrimary;
pub use secondary::SqliteSecondary;
