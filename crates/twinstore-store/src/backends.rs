//! Backend lifecycle
//!
//! [`Backends`] owns the primary connection provider and the process-wide
//! secondary client. It is created once with [`Backends::connect`], lent by
//! reference to readers and writers, and torn down with
//! [`Backends::shutdown`].

#![allow(clippy::result_large_err)]

use crate::config::BackendConfig;
use crate::db;
use crate::errors::Result;
use crate::migrations::{apply_migrations, Schema};
use crate::primary::SqlitePrimary;
use crate::secondary::SqliteSecondary;
use tracing::{info, warn};
use twinstore_core::{BackendKind, Mode, PrimaryStore, SecondaryStore};

pub struct Backends {
    primary: SqlitePrimary,
    secondary: Option<SqliteSecondary>,
    default_mode: Mode,
}

impl Backends {
    /// Set up both backends from configuration.
    ///
    /// The primary is reached per operation, so nothing is opened for it
    /// here. A configured secondary that cannot be opened is logged and
    /// left unavailable; modes that need it then fail with a configuration
    /// error.
    pub fn connect(config: &BackendConfig) -> Self {
        let primary = SqlitePrimary::new(&config.primary.path, config.busy_timeout());
        let secondary = config.secondary.as_ref().and_then(|s| {
            match SqliteSecondary::connect(&s.path, s.retry.clone()) {
                Ok(client) => {
                    info!(backend = %BackendKind::Secondary, path = %s.path.display(), "client connected");
                    Some(client)
                }
                Err(err) => {
                    warn!(
                        backend = %BackendKind::Secondary,
                        path = %s.path.display(),
                        error = %err,
                        "secondary unavailable, continuing without it"
                    );
                    None
                }
            }
        });
        Self {
            primary,
            secondary,
            default_mode: config.default_mode.unwrap_or_default(),
        }
    }

    /// Create both database files as needed and bring their schemas up to date
    pub fn init_schema(config: &BackendConfig) -> Result<()> {
        let mut conn = db::open_or_create(&config.primary.path, BackendKind::Primary)?;
        db::configure_primary(&conn, config.busy_timeout())?;
        apply_migrations(&mut conn, Schema::Primary)?;

        if let Some(secondary) = &config.secondary {
            let mut conn = db::open_or_create(&secondary.path, BackendKind::Secondary)?;
            db::configure_secondary(&conn)?;
            apply_migrations(&mut conn, Schema::Secondary)?;
        }
        Ok(())
    }

    pub fn primary(&self) -> &dyn PrimaryStore {
        &self.primary
    }

    /// The secondary client, if configured and reachable
    pub fn secondary(&self) -> Option<&dyn SecondaryStore> {
        self.secondary.as_ref().map(|s| s as &dyn SecondaryStore)
    }

    /// Mode applied to requests that carry none
    pub fn default_mode(&self) -> Mode {
        self.default_mode
    }

    /// Close the secondary client
    pub fn shutdown(&self) {
        if let Some(secondary) = &self.secondary {
            secondary.shutdown();
        }
    }
}
