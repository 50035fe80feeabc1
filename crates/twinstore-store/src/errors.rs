//! Error handling for twinstore-store
//!
//! Every driver error is folded into an `ExError` here, tagged with the
//! backend it came from. Nothing outside this crate sees `rusqlite::Error`.

use rusqlite::ErrorCode;
use thiserror::Error;
use twinstore_core::errors::{ExError, ExErrorKind};
use twinstore_core::BackendKind;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Classify a driver error by its SQLite result code
pub fn kind_of(err: &rusqlite::Error) -> ExErrorKind {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => match e.code {
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => ExErrorKind::Contention,
            ErrorCode::CannotOpen | ErrorCode::NotADatabase | ErrorCode::PermissionDenied => {
                ExErrorKind::Connection
            }
            _ => ExErrorKind::BackendExecution,
        },
        _ => ExErrorKind::BackendExecution,
    }
}

/// Create a backend error from rusqlite::Error
pub fn from_rusqlite(backend: BackendKind, err: rusqlite::Error) -> ExError {
    ExError::new(kind_of(&err))
        .with_op("sqlite")
        .with_backend(backend)
        .with_message(err.to_string())
}

/// Failure to obtain a handle, whatever the driver said
pub fn connection_error(backend: BackendKind, err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::Connection)
        .with_op("connect")
        .with_backend(backend)
        .with_message(err.to_string())
}

/// The secondary client has been shut down
pub fn client_closed() -> ExError {
    ExError::new(ExErrorKind::Connection)
        .with_op("connect")
        .with_backend(BackendKind::Secondary)
        .with_message("secondary client is shut down")
}

/// A column could not be decoded into its declared type
pub fn decode_error(backend: BackendKind, column: usize, reason: &str) -> ExError {
    ExError::new(ExErrorKind::BackendExecution)
        .with_op("decode_row")
        .with_backend(backend)
        .with_message(format!("column {}: {}", column, reason))
}

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> ExError {
    ExError::new(ExErrorKind::BackendExecution)
        .with_op("migration")
        .with_message(format!("Migration {} failed: {}", migration_id, reason))
}

/// Create a checksum mismatch error
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> ExError {
    ExError::new(ExErrorKind::Internal)
        .with_op("migration_checksum")
        .with_message(format!(
            "Checksum mismatch for migration {}: expected {}, got {}",
            migration_id, expected, actual
        ))
}

/// Create an IO error
pub fn io_error(operation: &str, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}

/// Configuration loading failures
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {reason}")]
    InvalidOverride { key: String, reason: String },

    #[error("Secondary retry policy is invalid: {reason}")]
    InvalidRetry { reason: String },
}

impl From<ConfigError> for ExError {
    fn from(err: ConfigError) -> Self {
        ExError::new(ExErrorKind::Configuration)
            .with_op("load_config")
            .with_message(err.to_string())
    }
}
