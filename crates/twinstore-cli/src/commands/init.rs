//! Schema initialisation

use super::{print_json, CliResult, Session};
use serde_json::json;
use twinstore_store::Backends;

pub fn execute(session: &Session) -> CliResult {
    Backends::init_schema(&session.config)?;
    print_json(&json!({
        "primary": session.config.primary.path.display().to_string(),
        "secondary": session
            .config
            .secondary
            .as_ref()
            .map(|s| s.path.display().to_string()),
    }))
}
