//! Subcommands and the state they share

pub mod init;
pub mod read;
pub mod write;

use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use twinstore_core::logging_facility::{init as init_logging, Profile};
use twinstore_core::Mode;
use twinstore_store::{BackendConfig, Backends};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

const DEFAULT_CONFIG: &str = "twinstore.toml";
const DEFAULT_PRIMARY: &str = ".twinstore/primary.db";

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// primary, secondary or dual; the configured default when omitted
    #[arg(long, global = true)]
    pub mode: Option<String>,
}

/// Configuration and connected backends for one invocation
pub struct Session {
    pub config: BackendConfig,
    pub backends: Backends,
    pub mode: Option<String>,
}

impl Session {
    /// Load configuration, start logging and connect.
    ///
    /// An explicit `--config` must exist; otherwise `twinstore.toml` is
    /// used when present and built-in defaults when not.
    ///
    /// # Errors
    ///
    /// Unreadable or invalid configuration.
    pub fn open(args: &GlobalArgs) -> Result<Self, Box<dyn std::error::Error>> {
        let config = match &args.config {
            Some(path) => BackendConfig::load(path)?,
            None if PathBuf::from(DEFAULT_CONFIG).exists() => BackendConfig::load(DEFAULT_CONFIG)?,
            None => BackendConfig::new(DEFAULT_PRIMARY),
        }
        .apply_env()?;

        let profile = match config.log.as_deref() {
            Some(name) => name.parse::<Profile>()?,
            None => Profile::Production,
        };
        init_logging(profile);

        let backends = Backends::connect(&config);
        Ok(Self {
            config,
            backends,
            mode: args.mode.clone(),
        })
    }

    /// The `--mode` flag, parsed
    ///
    /// # Errors
    ///
    /// An unrecognised mode name.
    pub fn mode(&self) -> Result<Option<Mode>, Box<dyn std::error::Error>> {
        match self.mode.as_deref() {
            None => Ok(None),
            Some(raw) => Ok(Some(raw.parse::<Mode>()?)),
        }
    }

    pub fn close(&self) {
        self.backends.shutdown();
    }
}

/// Print a value as pretty JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
