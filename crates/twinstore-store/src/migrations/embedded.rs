//! Embedded SQL migrations
//!
//! Migrations are embedded at compile time using include_str!

use twinstore_core::BackendKind;

/// Migration metadata
pub struct Migration {
    pub id: &'static str,
    pub sql: &'static str,
}

/// Which store a migration set belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    Primary,
    Secondary,
}

impl Schema {
    pub fn backend(&self) -> BackendKind {
        match self {
            Schema::Primary => BackendKind::Primary,
            Schema::Secondary => BackendKind::Secondary,
        }
    }

    /// All migrations of this set, in order
    pub fn migrations(&self) -> Vec<Migration> {
        match self {
            Schema::Primary => vec![Migration {
                id: "001_initial_schema",
                sql: include_str!("../../migrations/primary/001_initial_schema.sql"),
            }],
            Schema::Secondary => vec![Migration {
                id: "001_initial_schema",
                sql: include_str!("../../migrations/secondary/001_initial_schema.sql"),
            }],
        }
    }
}
