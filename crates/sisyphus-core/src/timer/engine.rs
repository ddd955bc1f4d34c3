//! Timer engine implementation.
//!
//! The engine is a deadline-based state machine. It does not use internal
//! threads and never decrements a counter per tick: while running it stores
//! an absolute deadline and recomputes the remaining time from the clock at
//! every observation (`tick()`, `refresh()`, or any query). A host that was
//! suspended for an hour simply observes the expiry on its next call.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//!   ^        |           |
//!   +--------+-----------+  (reset / switch_mode / completion)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(config, SystemClock);
//! engine.start();
//! // In a loop, or whenever the window regains focus:
//! if let Some(done) = engine.tick() { /* record done */ }
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::phase::{self, Phase};
use crate::clock::{Clock, SystemClock};
use crate::error::ValidationError;
use crate::events::Event;
use crate::settings::TimerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    /// No countdown started for the current phase.
    Idle,
    /// Counting down against `deadline`.
    Running,
    /// Countdown frozen at `remaining_secs`.
    Paused,
}

/// Serializable timer state.
///
/// `deadline` is present iff `status` is `Running`. While running,
/// `remaining_secs` is only the value at the last observation; the engine
/// recomputes it from `deadline` whenever asked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    pub phase: Phase,
    pub status: TimerStatus,
    pub remaining_secs: u64,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    /// When the current interval first started running.
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_work_count: u32,
    #[serde(default)]
    pub active_task_id: Option<String>,
}

impl TimerState {
    /// Fresh idle state at the start of a work interval.
    pub fn new(config: &TimerConfig) -> Self {
        Self {
            phase: Phase::Work,
            status: TimerStatus::Idle,
            remaining_secs: config.duration_secs(Phase::Work),
            deadline: None,
            started_at: None,
            completed_work_count: 0,
            active_task_id: None,
        }
    }
}

/// A finished interval, handed to session and task bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub phase: Phase,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Planned duration of the finished phase, not the measured wall time.
    pub duration_min: u32,
    /// Active task at the moment of completion.
    pub task_id: Option<String>,
    pub skipped: bool,
    pub next_phase: Phase,
    pub next_duration_min: u32,
    pub auto_started: bool,
}

/// Core timer engine.
///
/// Operates on absolute deadlines -- no internal thread.
/// The caller is responsible for calling `tick()` to observe expiry.
#[derive(Debug, Clone)]
pub struct TimerEngine<C: Clock = SystemClock> {
    config: TimerConfig,
    state: TimerState,
    clock: C,
}

impl<C: Clock> TimerEngine<C> {
    /// Create an idle engine at the start of a work interval.
    pub fn new(config: TimerConfig, clock: C) -> Self {
        let state = TimerState::new(&config);
        Self {
            config,
            state,
            clock,
        }
    }

    /// Rebuild an engine from persisted state.
    ///
    /// A running state without a deadline cannot be resumed faithfully and
    /// is downgraded to paused; a stray deadline on a stopped state is dropped.
    pub fn restore(config: TimerConfig, mut state: TimerState, clock: C) -> Self {
        match (state.status, state.deadline) {
            (TimerStatus::Running, None) => state.status = TimerStatus::Paused,
            (TimerStatus::Idle | TimerStatus::Paused, Some(_)) => state.deadline = None,
            _ => {}
        }
        Self {
            config,
            state,
            clock,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn config(&self) -> &TimerConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Consume the engine and return its persisted form.
    pub fn into_state(self) -> TimerState {
        self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn status(&self) -> TimerStatus {
        self.state.status
    }

    pub fn completed_work_count(&self) -> u32 {
        self.state.completed_work_count
    }

    pub fn active_task_id(&self) -> Option<&str> {
        self.state.active_task_id.as_deref()
    }

    /// Remaining seconds, measured against the clock while running.
    pub fn remaining_secs(&self) -> u64 {
        match (self.state.status, self.state.deadline) {
            (TimerStatus::Running, Some(deadline)) => remaining_until(deadline, self.clock.now()),
            _ => self.state.remaining_secs,
        }
    }

    /// Planned length of the current phase in seconds.
    pub fn total_secs(&self) -> u64 {
        self.config.duration_secs(self.state.phase)
    }

    /// 0.0 .. 100.0 progress within the current phase.
    pub fn progress_pct(&self) -> f64 {
        let total = self.total_secs();
        if total == 0 {
            return 0.0;
        }
        let remaining = self.remaining_secs().min(total);
        (total - remaining) as f64 / total as f64 * 100.0
    }

    /// Remaining time as `MM:SS`.
    pub fn display(&self) -> String {
        format_mm_ss(self.remaining_secs())
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            status: self.state.status,
            phase: self.state.phase,
            remaining_secs: self.remaining_secs(),
            total_secs: self.total_secs(),
            progress_pct: self.progress_pct(),
            display: self.display(),
            completed_work_count: self.state.completed_work_count,
            active_task_id: self.state.active_task_id.clone(),
            at: self.clock.now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> Option<Event> {
        match self.state.status {
            TimerStatus::Idle | TimerStatus::Paused => {
                let now = self.clock.now();
                let deadline = now + Duration::seconds(self.state.remaining_secs as i64);
                self.state.status = TimerStatus::Running;
                self.state.deadline = Some(deadline);
                self.state.started_at.get_or_insert(now);
                debug!(phase = %self.state.phase, remaining = self.state.remaining_secs, "timer started");
                Some(Event::TimerStarted {
                    phase: self.state.phase,
                    remaining_secs: self.state.remaining_secs,
                    deadline,
                    at: now,
                })
            }
            TimerStatus::Running => None, // Already running.
        }
    }

    pub fn pause(&mut self) -> Option<Event> {
        match (self.state.status, self.state.deadline) {
            (TimerStatus::Running, Some(deadline)) => {
                let now = self.clock.now();
                self.state.remaining_secs = remaining_until(deadline, now);
                self.state.deadline = None;
                self.state.status = TimerStatus::Paused;
                debug!(phase = %self.state.phase, remaining = self.state.remaining_secs, "timer paused");
                Some(Event::TimerPaused {
                    phase: self.state.phase,
                    remaining_secs: self.state.remaining_secs,
                    at: now,
                })
            }
            _ => None,
        }
    }

    /// Stop and rewind the current phase. Discards the partial interval.
    pub fn reset(&mut self) -> Option<Event> {
        self.stop_at_phase(self.state.phase);
        debug!(phase = %self.state.phase, "timer reset");
        Some(Event::TimerReset {
            phase: self.state.phase,
            remaining_secs: self.state.remaining_secs,
            at: self.clock.now(),
        })
    }

    /// Jump to `phase`, idle, discarding any partial interval.
    pub fn switch_mode(&mut self, phase: Phase) -> Option<Event> {
        let from = self.state.phase;
        self.stop_at_phase(phase);
        debug!(%from, to = %phase, "mode switched");
        Some(Event::ModeSwitched {
            from,
            to: phase,
            remaining_secs: self.state.remaining_secs,
            at: self.clock.now(),
        })
    }

    /// Finish the current interval now, crediting its planned duration.
    pub fn skip(&mut self) -> Option<Completion> {
        match self.state.status {
            TimerStatus::Running | TimerStatus::Paused => Some(self.complete(true)),
            TimerStatus::Idle => None,
        }
    }

    /// Observe the clock. Returns the completion when the deadline has passed.
    pub fn tick(&mut self) -> Option<Completion> {
        let deadline = match (self.state.status, self.state.deadline) {
            (TimerStatus::Running, Some(deadline)) => deadline,
            _ => return None,
        };
        let now = self.clock.now();
        self.state.remaining_secs = remaining_until(deadline, now);
        if now >= deadline {
            return Some(self.complete(false));
        }
        None
    }

    /// Replace the configuration.
    ///
    /// An idle timer picks up the new duration immediately. A running or
    /// paused interval keeps its deadline / frozen remainder; the new values
    /// apply from the next phase.
    pub fn set_config(&mut self, config: TimerConfig) -> Result<(), ValidationError> {
        config.validate()?;
        self.config = config;
        if self.state.status == TimerStatus::Idle {
            self.state.remaining_secs = self.config.duration_secs(self.state.phase);
        }
        Ok(())
    }

    pub fn set_active_task(&mut self, task_id: Option<String>) {
        self.state.active_task_id = task_id;
    }

    /// Drop the active task if it is `task_id`. The countdown is unaffected.
    pub fn clear_active_task_if(&mut self, task_id: &str) -> bool {
        if self.state.active_task_id.as_deref() == Some(task_id) {
            self.state.active_task_id = None;
            return true;
        }
        false
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn stop_at_phase(&mut self, phase: Phase) {
        self.state.phase = phase;
        self.state.status = TimerStatus::Idle;
        self.state.deadline = None;
        self.state.started_at = None;
        self.state.remaining_secs = self.config.duration_secs(phase);
    }

    fn complete(&mut self, skipped: bool) -> Completion {
        let now = self.clock.now();
        let finished = self.state.phase;
        let transition = phase::advance(finished, self.state.completed_work_count, &self.config);
        let started_at = self.state.started_at.unwrap_or(now);

        self.state.completed_work_count = transition.completed_work_count;
        self.stop_at_phase(transition.next);
        let auto_started = self.config.auto_starts(transition.next) && self.start().is_some();

        debug!(
            %finished,
            next = %transition.next,
            skipped,
            auto_started,
            "phase completed"
        );

        Completion {
            phase: finished,
            started_at,
            ended_at: now,
            duration_min: self.config.duration_min(finished),
            task_id: self.state.active_task_id.clone(),
            skipped,
            next_phase: transition.next,
            next_duration_min: transition.duration_min,
            auto_started,
        }
    }
}

/// Whole seconds left until `deadline`, rounded up, never negative.
fn remaining_until(deadline: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let ms = (deadline - now).num_milliseconds();
    if ms <= 0 {
        0
    } else {
        (ms as u64).div_ceil(1000)
    }
}

/// Format seconds as `MM:SS`.
pub fn format_mm_ss(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;

    fn engine() -> (TimerEngine<ManualClock>, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 6, 9, 0, 0).unwrap());
        (TimerEngine::new(TimerConfig::default(), clock.clone()), clock)
    }

    #[test]
    fn start_pause_start() {
        let (mut engine, _clock) = engine();
        assert_eq!(engine.status(), TimerStatus::Idle);

        assert!(engine.start().is_some());
        assert_eq!(engine.status(), TimerStatus::Running);
        assert!(engine.state().deadline.is_some());

        assert!(engine.pause().is_some());
        assert_eq!(engine.status(), TimerStatus::Paused);
        assert!(engine.state().deadline.is_none());

        assert!(engine.start().is_some());
        assert_eq!(engine.status(), TimerStatus::Running);
    }

    #[test]
    fn misuse_is_a_silent_noop() {
        let (mut engine, _clock) = engine();
        assert!(engine.pause().is_none());
        assert!(engine.skip().is_none());
        assert!(engine.tick().is_none());
        engine.start();
        assert!(engine.start().is_none());
    }

    #[test]
    fn remaining_follows_the_clock_not_ticks() {
        let (mut engine, clock) = engine();
        engine.start();
        clock.advance_secs(600);
        assert_eq!(engine.remaining_secs(), 25 * 60 - 600);
    }

    #[test]
    fn pause_rounds_partial_seconds_up() {
        let (mut engine, clock) = engine();
        engine.start();
        clock.advance(Duration::milliseconds(1_500));
        engine.pause();
        assert_eq!(engine.remaining_secs(), 25 * 60 - 1);
    }

    #[test]
    fn expiry_is_detected_after_a_long_suspension() {
        let (mut engine, clock) = engine();
        engine.start();
        clock.advance_secs(3 * 3600);
        let done = engine.tick().expect("expired");
        assert_eq!(done.phase, Phase::Work);
        assert_eq!(done.duration_min, 25);
        assert!(!done.skipped);
        assert_eq!(engine.phase(), Phase::ShortBreak);
        assert_eq!(engine.status(), TimerStatus::Idle);
        assert_eq!(engine.remaining_secs(), 5 * 60);
        assert_eq!(engine.completed_work_count(), 1);
    }

    #[test]
    fn skip_from_paused_completes() {
        let (mut engine, _clock) = engine();
        engine.start();
        engine.pause();
        let done = engine.skip().expect("skipped");
        assert!(done.skipped);
        assert_eq!(done.next_phase, Phase::ShortBreak);
    }

    #[test]
    fn completion_carries_start_of_first_run() {
        let (mut engine, clock) = engine();
        let t0 = clock.now();
        engine.start();
        clock.advance_secs(60);
        engine.pause();
        clock.advance_secs(60);
        engine.start();
        let done = engine.skip().unwrap();
        assert_eq!(done.started_at, t0);
        assert_eq!(done.ended_at, t0 + Duration::seconds(120));
    }

    #[test]
    fn auto_start_breaks_only() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 6, 9, 0, 0).unwrap());
        let config = TimerConfig {
            auto_start_breaks: true,
            ..TimerConfig::default()
        };
        let mut engine = TimerEngine::new(config, clock.clone());
        engine.start();
        let done = engine.skip().unwrap();
        assert!(done.auto_started);
        assert_eq!(engine.status(), TimerStatus::Running);

        let done = engine.skip().unwrap();
        assert_eq!(done.phase, Phase::ShortBreak);
        assert!(!done.auto_started);
        assert_eq!(engine.phase(), Phase::Work);
        assert_eq!(engine.status(), TimerStatus::Idle);
    }

    #[test]
    fn reset_rewinds_current_phase() {
        let (mut engine, clock) = engine();
        engine.switch_mode(Phase::LongBreak);
        engine.start();
        clock.advance_secs(120);
        engine.reset();
        assert_eq!(engine.phase(), Phase::LongBreak);
        assert_eq!(engine.status(), TimerStatus::Idle);
        assert_eq!(engine.remaining_secs(), 15 * 60);
        assert!(engine.state().started_at.is_none());
    }

    #[test]
    fn config_change_applies_immediately_only_when_idle() {
        let (mut engine, clock) = engine();
        let longer = TimerConfig {
            work_duration: 50,
            ..TimerConfig::default()
        };
        engine.set_config(longer.clone()).unwrap();
        assert_eq!(engine.remaining_secs(), 50 * 60);

        engine.start();
        clock.advance_secs(60);
        engine.set_config(TimerConfig::default()).unwrap();
        assert_eq!(engine.remaining_secs(), 50 * 60 - 60);
    }

    #[test]
    fn invalid_config_is_rejected_and_previous_kept() {
        let (mut engine, _clock) = engine();
        let bad = TimerConfig {
            short_break_duration: 0,
            ..TimerConfig::default()
        };
        assert!(engine.set_config(bad).is_err());
        assert_eq!(engine.config(), &TimerConfig::default());
    }

    #[test]
    fn restore_repairs_inconsistent_state() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 6, 9, 0, 0).unwrap());
        let mut state = TimerState::new(&TimerConfig::default());
        state.status = TimerStatus::Running;
        let engine = TimerEngine::restore(TimerConfig::default(), state, clock);
        assert_eq!(engine.status(), TimerStatus::Paused);
    }

    #[test]
    fn display_formats_minutes_and_seconds() {
        assert_eq!(format_mm_ss(25 * 60), "25:00");
        assert_eq!(format_mm_ss(61), "01:01");
        assert_eq!(format_mm_ss(0), "00:00");
    }
}
