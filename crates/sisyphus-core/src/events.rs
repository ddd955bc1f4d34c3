use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{Phase, TimerStatus};

/// Every timer state change produces an Event.
/// Front-ends render them; the notifier reacts to `PhaseCompleted`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TimerStarted {
        phase: Phase,
        remaining_secs: u64,
        deadline: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    TimerPaused {
        phase: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        phase: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    ModeSwitched {
        from: Phase,
        to: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    PhaseCompleted {
        phase: Phase,
        duration_min: u32,
        skipped: bool,
        next_phase: Phase,
        next_duration_min: u32,
        auto_started: bool,
        /// Id of the session recorded for the finished phase.
        session_id: Option<String>,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        status: TimerStatus,
        phase: Phase,
        remaining_secs: u64,
        total_secs: u64,
        progress_pct: f64,
        display: String,
        completed_work_count: u32,
        active_task_id: Option<String>,
        at: DateTime<Utc>,
    },
}
