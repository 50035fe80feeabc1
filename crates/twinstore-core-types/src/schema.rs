//! Canonical schema constants for structured logging and events
//!
//! These constants keep field names identical across the coordinator,
//! the store adapters and the CLI.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_REQUEST_ID: &str = "request_id";
pub const FIELD_TRACE_ID: &str = "trace_id";
pub const FIELD_SESSION_ID: &str = "session_id";

// Routing
pub const FIELD_MODE: &str = "mode";
pub const FIELD_BACKEND: &str = "backend";

// Entity identifiers
pub const FIELD_ENTITY: &str = "entity";
pub const FIELD_ENTITY_ID: &str = "entity_id";
pub const FIELD_MUTATION_KIND: &str = "kind";

// Collection sizes / counters
pub const FIELD_ROWS: &str = "rows";
pub const FIELD_AFFECTED: &str = "affected";
pub const FIELD_ATTEMPT: &str = "attempt";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";

// Backend names as they appear in the `backend` field
pub const BACKEND_PRIMARY: &str = "primary";
pub const BACKEND_SECONDARY: &str = "secondary";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_accessibility() {
        assert!(!FIELD_COMPONENT.is_empty());
        assert!(!FIELD_OP.is_empty());
        assert!(!FIELD_MODE.is_empty());
        assert!(!EVENT_START.is_empty());
        assert!(!EVENT_END.is_empty());
        assert!(!EVENT_END_ERROR.is_empty());
    }

    #[test]
    fn test_event_names_are_distinct() {
        assert_ne!(EVENT_START, EVENT_END);
        assert_ne!(EVENT_START, EVENT_END_ERROR);
        assert_ne!(EVENT_END, EVENT_END_ERROR);
    }

    #[test]
    fn test_backend_names_are_distinct() {
        assert_ne!(BACKEND_PRIMARY, BACKEND_SECONDARY);
    }
}
