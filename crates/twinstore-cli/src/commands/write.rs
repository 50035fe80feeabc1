//! Write commands
//!
//! Field values are passed as raw `name=value` strings and decoded by the
//! engine the same way as any other inbound request.

use super::{print_json, CliResult, Session};
use clap::Args;
use twinstore_core::core_types::RequestContext;
use twinstore_engine::{Engine, InboundRequest};

#[derive(Debug, Args)]
pub struct CreateArgs {
    pub entity: String,

    /// Field value as name=value; repeat for each field
    #[arg(short = 'f', long = "field", value_parser = parse_field)]
    pub fields: Vec<(String, String)>,
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    pub entity: String,
    pub id: i64,

    /// Field value as name=value; repeat for each field
    #[arg(short = 'f', long = "field", value_parser = parse_field)]
    pub fields: Vec<(String, String)>,
}

#[derive(Debug, Args)]
pub struct DeleteArgs {
    pub entity: String,
    pub id: i64,
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected name=value, got '{}'", raw)),
    }
}

fn submit(session: &Session, mut request: InboundRequest) -> CliResult {
    if let Some(mode) = &session.mode {
        request = request.with_mode(mode.clone());
    }
    let response = Engine::new(&session.backends).handle(&RequestContext::new(), &request)?;
    print_json(&response)
}

fn with_fields(request: InboundRequest, fields: Vec<(String, String)>) -> InboundRequest {
    fields
        .into_iter()
        .fold(request, |req, (name, value)| req.with_field(name, value))
}

pub fn create(session: &Session, args: CreateArgs) -> CliResult {
    let request = with_fields(InboundRequest::new(args.entity, "create"), args.fields);
    submit(session, request)
}

pub fn update(session: &Session, args: UpdateArgs) -> CliResult {
    let request = with_fields(InboundRequest::new(args.entity, "update"), args.fields);
    submit(session, request.with_id(args.id))
}

pub fn delete(session: &Session, args: DeleteArgs) -> CliResult {
    submit(
        session,
        InboundRequest::new(args.entity, "delete").with_id(args.id),
    )
}
