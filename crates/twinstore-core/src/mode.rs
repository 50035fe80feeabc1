//! Mode selection
//!
//! A [`Mode`] decides which backend(s) serve an operation. It is resolved
//! from a [`ModeContext`] for every operation and never cached between
//! operations.

use crate::backend::BackendKind;
use crate::errors::ModelError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::RwLock;
use twinstore_core_types::SessionId;

/// Consistency mode of a single operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Primary store only
    #[default]
    Primary,
    /// Secondary store only
    Secondary,
    /// Both stores; reads from the primary
    Dual,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Primary, Mode::Secondary, Mode::Dual];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Primary => "primary",
            Mode::Secondary => "secondary",
            Mode::Dual => "dual",
        }
    }

    /// Whether the mode needs a configured secondary store
    pub fn requires_secondary(&self) -> bool {
        matches!(self, Mode::Secondary | Mode::Dual)
    }

    /// Backend that serves reads in this mode
    pub fn read_backend(&self) -> BackendKind {
        match self {
            Mode::Secondary => BackendKind::Secondary,
            Mode::Primary | Mode::Dual => BackendKind::Primary,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary" => Ok(Mode::Primary),
            "secondary" => Ok(Mode::Secondary),
            "dual" => Ok(Mode::Dual),
            _ => Err(ModelError::InvalidMode {
                value: s.to_string(),
            }),
        }
    }
}

/// Everything known about the caller's mode choice for one operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeContext {
    /// Mode passed with the request itself
    pub explicit: Option<Mode>,
    /// Mode stored for the caller's session
    pub session: Option<Mode>,
}

impl ModeContext {
    pub fn explicit(mode: Mode) -> Self {
        Self {
            explicit: Some(mode),
            session: None,
        }
    }

    /// Explicit mode wins over the session mode; neither means primary
    pub fn resolve(&self) -> Mode {
        self.resolve_or(Mode::default())
    }

    /// As [`resolve`](Self::resolve) with a configured fallback
    pub fn resolve_or(&self, fallback: Mode) -> Mode {
        self.explicit.or(self.session).unwrap_or(fallback)
    }
}

/// Resolve the mode for one operation
pub fn resolve(context: &ModeContext) -> Mode {
    context.resolve()
}

/// In-process table of per-session mode choices
#[derive(Debug, Default)]
pub struct SessionModes {
    modes: RwLock<HashMap<SessionId, Mode>>,
}

impl SessionModes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and store a session's choice.
    ///
    /// An invalid choice is rejected and the stored value is left as it was.
    pub fn select(&self, session: &SessionId, choice: &str) -> Result<Mode, ModelError> {
        let mode = choice.parse::<Mode>()?;
        let mut modes = self.modes.write().unwrap_or_else(|p| p.into_inner());
        modes.insert(session.clone(), mode);
        Ok(mode)
    }

    pub fn get(&self, session: &SessionId) -> Option<Mode> {
        let modes = self.modes.read().unwrap_or_else(|p| p.into_inner());
        modes.get(session).copied()
    }

    pub fn clear(&self, session: &SessionId) -> Option<Mode> {
        let mut modes = self.modes.write().unwrap_or_else(|p| p.into_inner());
        modes.remove(session)
    }

    /// Context for one operation of this session
    pub fn context(&self, session: &SessionId, explicit: Option<Mode>) -> ModeContext {
        ModeContext {
            explicit,
            session: self.get(session),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_mode_is_primary() {
        assert_eq!(resolve(&ModeContext::default()), Mode::Primary);
        assert_eq!(
            resolve(&ModeContext::default()),
            resolve(&ModeContext::explicit(Mode::Primary))
        );
    }

    #[test]
    fn test_explicit_beats_session() {
        let ctx = ModeContext {
            explicit: Some(Mode::Secondary),
            session: Some(Mode::Dual),
        };
        assert_eq!(ctx.resolve(), Mode::Secondary);
        let ctx = ModeContext {
            explicit: None,
            session: Some(Mode::Dual),
        };
        assert_eq!(ctx.resolve(), Mode::Dual);
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(" Dual ".parse::<Mode>(), Ok(Mode::Dual));
        assert_eq!(
            "spanner".parse::<Mode>(),
            Err(ModelError::InvalidMode {
                value: "spanner".to_string()
            })
        );
    }

    #[test]
    fn test_session_select_keeps_previous_on_invalid() {
        let sessions = SessionModes::new();
        let sid = SessionId::from_string("s1");
        assert_eq!(sessions.get(&sid), None);

        sessions.select(&sid, "dual").unwrap();
        assert!(sessions.select(&sid, "both").is_err());
        assert_eq!(sessions.get(&sid), Some(Mode::Dual));

        assert_eq!(sessions.context(&sid, None).resolve(), Mode::Dual);
        assert_eq!(
            sessions.context(&sid, Some(Mode::Primary)).resolve(),
            Mode::Primary
        );

        assert_eq!(sessions.clear(&sid), Some(Mode::Dual));
        assert_eq!(sessions.context(&sid, None).resolve(), Mode::Primary);
    }

    #[test]
    fn test_read_backend() {
        assert_eq!(Mode::Dual.read_backend(), BackendKind::Primary);
        assert_eq!(Mode::Secondary.read_backend(), BackendKind::Secondary);
        assert!(!Mode::Primary.requires_secondary());
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&Mode::Secondary).unwrap();
        assert_eq!(json, "\"secondary\"");
        let mode: Mode = serde_json::from_str("\"dual\"").unwrap();
        assert_eq!(mode, Mode::Dual);
    }
}
