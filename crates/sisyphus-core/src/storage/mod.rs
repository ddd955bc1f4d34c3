//! Persistence for tasks, sessions, settings and timer state.
//!
//! Everything is partitioned by [`UserId`]. A user with no account runs on
//! [`MemoryStore`]; named users get a [`SqliteStore`] under the data dir.

mod config;
mod memory;
pub mod migrations;
mod sqlite;

pub use config::AppConfig;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, StorageError};
use crate::session::Session;
use crate::settings::Settings;
use crate::task::Task;
use crate::timer::TimerState;

/// Returns the data directory, creating it if needed.
///
/// `SISYPHUS_HOME` overrides the location outright. Otherwise this is
/// `~/.config/sisyphus/`, or `~/.config/sisyphus-dev/` when
/// `SISYPHUS_ENV=dev`.
///
/// # Errors
/// Returns an error if no home directory is known or the directory
/// cannot be created.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("SISYPHUS_HOME") {
        Some(home) => PathBuf::from(home),
        None => {
            let base = dirs::home_dir().ok_or(ConfigError::NoDataDir)?.join(".config");
            let env = std::env::var("SISYPHUS_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base.join("sisyphus-dev")
            } else {
                base.join("sisyphus")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::SaveFailed {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}

/// Opaque identity that partitions stored data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Key used for data that belongs to no signed-in user.
    pub const ANONYMOUS: &'static str = "anonymous";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn anonymous() -> Self {
        Self(Self::ANONYMOUS.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-user persistence backend.
///
/// Calls are synchronous. Implementations must not hold state that ties
/// them to one thread, so a tracker can move behind a mutex.
pub trait Store: Send {
    fn load_tasks(&self, user: &UserId) -> Result<Vec<Task>, StorageError>;

    fn create_task(&self, user: &UserId, task: &Task) -> Result<Task, StorageError>;

    /// Overwrite the stored row with `task`. Errors if no such task exists.
    fn update_task(&self, user: &UserId, task: &Task) -> Result<(), StorageError>;

    fn delete_task(&self, user: &UserId, id: &str) -> Result<(), StorageError>;

    fn load_sessions(&self, user: &UserId) -> Result<Vec<Session>, StorageError>;

    fn create_session(&self, user: &UserId, session: &Session) -> Result<Session, StorageError>;

    /// `None` when the user never saved settings.
    fn load_settings(&self, user: &UserId) -> Result<Option<Settings>, StorageError>;

    fn save_settings(&self, user: &UserId, settings: &Settings) -> Result<(), StorageError>;

    fn load_timer(&self, user: &UserId) -> Result<Option<TimerState>, StorageError>;

    fn save_timer(&self, user: &UserId, state: &TimerState) -> Result<(), StorageError>;
}
