//! # Sisyphus Core Library
//!
//! Core logic for the Sisyphus focus-session tracker: a Pomodoro-style
//! timer that alternates work intervals with short and long breaks,
//! credits finished work to tasks, and reports on the recorded history.
//! The `sisyphus` CLI is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Timer Engine**: a deadline-based state machine; remaining time is
//!   always recomputed from the clock, never counted down
//! - **Phase Policy**: pure sequencing of work / short break / long break
//! - **Tasks & Sessions**: task ledger and the append-only session log
//! - **Stats**: streaks, period totals, project rollups, paged history
//! - **Storage**: per-user persistence (in-memory or SQLite) and the TOML
//!   application config
//!
//! ## Key Components
//!
//! - [`Tracker`]: the state container hosts drive
//! - [`TimerEngine`]: core timer state machine
//! - [`Store`]: persistence seam, with [`MemoryStore`] and [`SqliteStore`]
//! - [`Reporter`]: pure reporting projection over sessions

pub mod clock;
pub mod error;
pub mod events;
pub mod notify;
pub mod session;
pub mod settings;
pub mod stats;
pub mod storage;
pub mod task;
pub mod timer;
pub mod tracker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, Result, StorageError, ValidationError};
pub use events::Event;
pub use notify::{Alert, LogNotifier, Notifier};
pub use session::{Session, SessionLog};
pub use settings::{Settings, TimerConfig};
pub use stats::{Bucket, HistoryPage, Period, PeriodReport, ProjectBucket, Reporter};
pub use storage::{AppConfig, MemoryStore, SqliteStore, Store, UserId};
pub use task::{NewTask, Task, TaskLedger, TaskPatch, TaskSummary, NO_PROJECT};
pub use timer::{Completion, Phase, TimerEngine, TimerState, TimerStatus};
pub use tracker::{Notice, SharedTracker, Tracker};
