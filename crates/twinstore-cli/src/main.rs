//! twinstore CLI
//!
//! Command-line front end for the dual-write engine

use clap::{Parser, Subcommand};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "twinstore")]
#[command(about = "twinstore - coordinated writes over a primary and a secondary store", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: commands::GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create both databases and apply migrations
    Init,
    /// List every record of an entity
    List(commands::read::ListArgs),
    /// Show one record
    Get(commands::read::GetArgs),
    /// Show the sales-order report
    Orders,
    /// Create a record
    Create(commands::write::CreateArgs),
    /// Replace the fields of a record
    Update(commands::write::UpdateArgs),
    /// Delete a record and clean up what references it
    Delete(commands::write::DeleteArgs),
}

fn main() {
    // A missing .env is fine
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let result = commands::Session::open(&cli.global).and_then(|session| {
        let outcome = match cli.command {
            Commands::Init => commands::init::execute(&session),
            Commands::List(args) => commands::read::list(&session, args),
            Commands::Get(args) => commands::read::get(&session, args),
            Commands::Orders => commands::read::orders(&session),
            Commands::Create(args) => commands::write::create(&session, args),
            Commands::Update(args) => commands::write::update(&session, args),
            Commands::Delete(args) => commands::write::delete(&session, args),
        };
        session.close();
        outcome
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
