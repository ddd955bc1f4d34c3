//! Subcommand handlers. Each prints JSON (or CSV) to stdout.

pub mod config;
pub mod report;
pub mod session;
pub mod task;
pub mod timer;

use serde::Serialize;
use sisyphus_core::{AppConfig, SqliteStore, SystemClock, Tracker, UserId};
use tracing::debug;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Global options resolved against the config file.
pub struct Context {
    config: AppConfig,
    user: Option<String>,
    ephemeral: bool,
}

impl Context {
    pub fn new(config: AppConfig, user: Option<String>, ephemeral: bool) -> Self {
        Self {
            config,
            user,
            ephemeral,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Open the tracker for the resolved user.
    ///
    /// Without a user (or with `--ephemeral`) the tracker lives in memory
    /// and forgets everything on exit.
    pub fn tracker(&self) -> Result<Tracker, Box<dyn std::error::Error>> {
        let user = self.user.clone().or_else(|| self.config.user.clone());
        match user {
            Some(user) if !self.ephemeral => {
                let path = self.config.database_path()?;
                debug!(%user, path = %path.display(), "opening tracker");
                let store = SqliteStore::open(&path)?;
                Ok(Tracker::load(UserId::new(user), Box::new(store), SystemClock)?)
            }
            _ => {
                debug!("using ephemeral tracker");
                Ok(Tracker::ephemeral(SystemClock))
            }
        }
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Report failed background saves without failing the command.
pub fn flush_notices(tracker: &mut Tracker) {
    for notice in tracker.take_notices() {
        eprintln!("warning: {}", notice.message);
    }
}
