//! Engine facade
//!
//! [`Engine`] ties the router and the coordinator to one set of backends
//! and resolves the mode of every operation: the request's own mode, then
//! the caller's session mode, then the configured default (primary unless
//! configured otherwise).

#![allow(clippy::result_large_err)]

use crate::commands::engine_query::{apply_engine_query, EngineQuery, EngineQueryResult};
use crate::commands::inbound::InboundRequest;
use crate::commands::read_router::ReadRouter;
use crate::commands::write_coordinator::{WriteCoordinator, WriteOutcome};
use serde::Serialize;
use twinstore_core::{
    Mode, ModeContext, Mutation, PrimaryStore, Result, SecondaryStore, SessionModes,
};
use twinstore_core_types::{RequestContext, SessionId};
use twinstore_store::Backends;

/// Response to an inbound request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineResponse {
    pub request_id: String,
    #[serde(flatten)]
    pub outcome: WriteOutcome,
}

pub struct Engine<'a> {
    primary: &'a dyn PrimaryStore,
    secondary: Option<&'a dyn SecondaryStore>,
    default_mode: Mode,
    sessions: Option<&'a SessionModes>,
}

impl<'a> Engine<'a> {
    /// Engine over configured backends
    pub fn new(backends: &'a Backends) -> Self {
        Self::with_stores(backends.primary(), backends.secondary(), backends.default_mode())
    }

    /// Engine over arbitrary store implementations
    pub fn with_stores(
        primary: &'a dyn PrimaryStore,
        secondary: Option<&'a dyn SecondaryStore>,
        default_mode: Mode,
    ) -> Self {
        Self {
            primary,
            secondary,
            default_mode,
            sessions: None,
        }
    }

    /// Consult a session table for requests that carry a session id
    pub fn with_sessions(mut self, sessions: &'a SessionModes) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn router(&self) -> ReadRouter<'a> {
        ReadRouter::new(self.primary, self.secondary)
    }

    pub fn coordinator(&self) -> WriteCoordinator<'a> {
        WriteCoordinator::new(self.primary, self.secondary)
    }

    /// Mode for one operation
    pub fn resolve_mode(&self, explicit: Option<Mode>, session: Option<&SessionId>) -> Mode {
        ModeContext {
            explicit,
            session: session
                .zip(self.sessions)
                .and_then(|(id, sessions)| sessions.get(id)),
        }
        .resolve_or(self.default_mode)
    }

    /// Apply an already validated mutation
    ///
    /// # Errors
    ///
    /// See [`WriteCoordinator::write`].
    pub fn write(&self, mutation: &Mutation, mode: Option<Mode>) -> Result<WriteOutcome> {
        self.coordinator()
            .write(mutation, self.resolve_mode(mode, None))
    }

    /// Run a read-only query
    ///
    /// # Errors
    ///
    /// See [`ReadRouter`].
    pub fn query(&self, query: &EngineQuery, mode: Option<Mode>) -> Result<EngineQueryResult> {
        apply_engine_query(&self.router(), query, self.resolve_mode(mode, None))
    }

    /// Decode and apply an inbound request
    ///
    /// # Errors
    ///
    /// `InvalidMode`, `UnknownEntity` or `InvalidInput` for a malformed
    /// request, otherwise see [`WriteCoordinator::write`].
    pub fn handle(&self, ctx: &RequestContext, request: &InboundRequest) -> Result<EngineResponse> {
        let explicit = request.requested_mode()?;
        let mutation = request.decode()?;
        let mode = self.resolve_mode(explicit, ctx.session_id.as_ref());
        tracing::debug!(
            request_id = %ctx.request_id,
            mode = mode.as_str(),
            "handling inbound request"
        );
        let outcome = self.coordinator().write(&mutation, mode)?;
        Ok(EngineResponse {
            request_id: ctx.request_id.to_string(),
            outcome,
        })
    }
}
