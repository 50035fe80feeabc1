use crate::backend::BackendKind;
use crate::model::FieldType;
use thiserror::Error;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every failure that leaves a twinstore crate is classified by one of these
/// kinds. Backend-specific errors (SQLite result codes, driver messages) are
/// folded into `Connection`, `BackendExecution` or `Contention` at the adapter
/// boundary so callers never see a driver error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Request validation
    InvalidInput,
    InvalidMode,
    UnknownEntity,

    // Lookup (only used where absence is exceptional; single-record reads
    // report absence through `Lookup::NotFound` instead)
    NotFound,

    // Backend
    /// Could not obtain a handle to a backend
    Connection,
    /// A statement failed inside an open handle
    BackendExecution,
    /// The backend refused the transaction because of concurrent access;
    /// only surfaces inside the secondary retry loop
    Contention,
    /// A mode needs a backend that is not configured or not reachable
    Configuration,

    // Integration/IO
    Serialization,
    Io,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::InvalidMode => "ERR_INVALID_MODE",
            ExErrorKind::UnknownEntity => "ERR_UNKNOWN_ENTITY",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::Connection => "ERR_CONNECTION",
            ExErrorKind::BackendExecution => "ERR_BACKEND_EXECUTION",
            ExErrorKind::Contention => "ERR_CONTENTION",
            ExErrorKind::Configuration => "ERR_CONFIGURATION",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// Whether the failure came from a backend rather than from the request
    pub fn is_backend(&self) -> bool {
        matches!(
            self,
            ExErrorKind::Connection
                | ExErrorKind::BackendExecution
                | ExErrorKind::Contention
                | ExErrorKind::Configuration
        )
    }
}

/// Canonical structured error type
///
/// Built with the `with_*` helpers so adapters can attach as much context as
/// they have at the failure site.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity: Option<String>,
    entity_id: Option<String>,
    backend: Option<BackendKind>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity: None,
            entity_id: None,
            backend: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity name context
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// Add entity identifier context
    pub fn with_entity_id(mut self, id: impl ToString) -> Self {
        self.entity_id = Some(id.to_string());
        self
    }

    /// Record which backend produced the failure
    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the entity name context, if any
    pub fn entity(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    /// Get the entity identifier context, if any
    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    /// Get the backend that failed, if known
    pub fn backend(&self) -> Option<BackendKind> {
        self.backend
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(backend) = self.backend {
            write!(f, " (backend: {})", backend)?;
        }
        if let Some(entity) = &self.entity {
            write!(f, " (entity: {})", entity)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (id: {})", entity_id)?;
        }
        if let Some(source) = &self.source {
            write!(f, "; caused by {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|s| s as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Validation failures raised while building requests against the catalog
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// No entity with this name exists in the catalog
    #[error("Unknown entity: {name}")]
    UnknownEntity { name: String },

    /// The entity has no field with this name
    #[error("Unknown field '{field}' on entity {entity}")]
    UnknownField { entity: String, field: String },

    /// A required field was not supplied
    #[error("Missing required field '{field}' on entity {entity}")]
    MissingField { entity: String, field: String },

    /// A store-generated field was supplied by the caller
    #[error("Field '{field}' on entity {entity} is generated by the store and cannot be written")]
    GeneratedField { entity: String, field: String },

    /// A value does not match the field's declared type
    #[error("Field '{field}' on entity {entity} expects {expected}, got {found}")]
    TypeMismatch {
        entity: String,
        field: String,
        expected: FieldType,
        found: &'static str,
    },

    /// A raw string could not be decoded into the field's type
    #[error("Invalid value for '{field}' on entity {entity}: {reason}")]
    InvalidValue {
        entity: String,
        field: String,
        reason: String,
    },

    /// Update or delete without an identifier
    #[error("Operation on entity {entity} requires an identifier")]
    MissingIdentifier { entity: String },

    /// Create with a caller-supplied identifier
    #[error("Identifiers for entity {entity} are assigned by the store")]
    UnexpectedIdentifier { entity: String },

    /// Mode string is not one of primary / secondary / dual
    #[error("Invalid mode: {value}")]
    InvalidMode { value: String },

    /// Operation string is not recognised
    #[error("Unknown operation: {value}")]
    UnknownOperation { value: String },
}

impl From<ModelError> for ExError {
    fn from(err: ModelError) -> Self {
        let message = err.to_string();
        match err {
            ModelError::UnknownEntity { name } => ExError::new(ExErrorKind::UnknownEntity)
                .with_entity(name)
                .with_message(message),

            ModelError::UnknownField { entity, .. }
            | ModelError::MissingField { entity, .. }
            | ModelError::GeneratedField { entity, .. }
            | ModelError::TypeMismatch { entity, .. }
            | ModelError::InvalidValue { entity, .. }
            | ModelError::MissingIdentifier { entity }
            | ModelError::UnexpectedIdentifier { entity } => {
                ExError::new(ExErrorKind::InvalidInput)
                    .with_entity(entity)
                    .with_message(message)
            }

            ModelError::InvalidMode { .. } => {
                ExError::new(ExErrorKind::InvalidMode).with_message(message)
            }

            ModelError::UnknownOperation { .. } => {
                ExError::new(ExErrorKind::InvalidInput).with_message(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_unique() {
        let kinds = [
            ExErrorKind::InvalidInput,
            ExErrorKind::InvalidMode,
            ExErrorKind::UnknownEntity,
            ExErrorKind::NotFound,
            ExErrorKind::Connection,
            ExErrorKind::BackendExecution,
            ExErrorKind::Contention,
            ExErrorKind::Configuration,
            ExErrorKind::Serialization,
            ExErrorKind::Io,
            ExErrorKind::Internal,
        ];
        let mut codes: Vec<_> = kinds.iter().map(|k| k.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
    }

    #[test]
    fn test_display_includes_context() {
        let err = ExError::new(ExErrorKind::BackendExecution)
            .with_op("write")
            .with_backend(BackendKind::Secondary)
            .with_entity("product")
            .with_entity_id(42)
            .with_message("UNIQUE constraint failed");

        let s = err.to_string();
        assert!(s.starts_with("[ERR_BACKEND_EXECUTION]"));
        assert!(s.contains("'write'"));
        assert!(s.contains("backend: secondary"));
        assert!(s.contains("id: 42"));
    }

    #[test]
    fn test_source_chain_exposed() {
        let inner = ExError::new(ExErrorKind::Contention).with_message("busy");
        let outer = ExError::new(ExErrorKind::BackendExecution).with_source(inner);

        let source = std::error::Error::source(&outer).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("[ERR_CONTENTION]: busy"));
        assert_eq!(
            outer.source_error().map(|e| e.kind()),
            Some(ExErrorKind::Contention)
        );
    }

    #[test]
    fn test_backend_kinds() {
        assert!(ExErrorKind::Connection.is_backend());
        assert!(ExErrorKind::Configuration.is_backend());
        assert!(!ExErrorKind::InvalidInput.is_backend());
    }
}
