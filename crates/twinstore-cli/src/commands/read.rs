//! Read commands

use super::{print_json, CliResult, Session};
use clap::Args;
use twinstore_engine::{Engine, EngineQuery};

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Entity name (product, employee, customer, sales_order)
    pub entity: String,
}

#[derive(Debug, Args)]
pub struct GetArgs {
    pub entity: String,
    pub id: i64,
}

fn run(session: &Session, query: EngineQuery) -> CliResult {
    let result = Engine::new(&session.backends).query(&query, session.mode()?)?;
    print_json(&result)
}

pub fn list(session: &Session, args: ListArgs) -> CliResult {
    run(
        session,
        EngineQuery::ReadAll {
            entity: args.entity,
        },
    )
}

pub fn get(session: &Session, args: GetArgs) -> CliResult {
    run(
        session,
        EngineQuery::ReadOne {
            entity: args.entity,
            id: args.id,
        },
    )
}

pub fn orders(session: &Session) -> CliResult {
    run(session, EngineQuery::OrderReport)
}
