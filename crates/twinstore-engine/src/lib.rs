//! twinstore engine - orchestration layer
//!
//! Routes reads to one backend and coordinates writes across both,
//! according to the mode selected for each operation.

pub mod commands;

pub use commands::engine_command::{Engine, EngineResponse};
pub use commands::engine_query::{apply_engine_query, EngineQuery, EngineQueryResult};
pub use commands::inbound::InboundRequest;
pub use commands::read_router::ReadRouter;
pub use commands::write_coordinator::{WriteCoordinator, WriteOutcome};
