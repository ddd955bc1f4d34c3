//! Tracker: the single state container a host talks to.
//!
//! Owns the timer engine, the task ledger, the session log and the user's
//! settings, and writes changes through to a [`Store`]. Every command first
//! observes the clock, so an expiry that happened while nobody was looking
//! is recorded before the command applies.
//!
//! Persistence is best-effort: a failed write is logged, queued as a
//! [`Notice`] for the host to show, and never undoes the in-memory change.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, FixedOffset, Local, Offset, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{CoreError, Result, StorageError};
use crate::events::Event;
use crate::notify::{Alert, LogNotifier, Notifier};
use crate::session::{self, Session, SessionLog};
use crate::settings::{Settings, TimerConfig};
use crate::stats::{self, Bucket, HistoryPage, Period, PeriodReport, ProjectBucket, Reporter};
use crate::storage::{MemoryStore, Store, UserId};
use crate::task::{NewTask, Task, TaskLedger, TaskPatch, TaskSummary};
use crate::timer::{Completion, Phase, TimerEngine, TimerState};

/// A non-blocking message for the user, e.g. a failed save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub at: DateTime<Utc>,
    pub message: String,
}

/// Tracker shared between threads. Lock it for every call.
pub type SharedTracker<C = SystemClock> = Arc<Mutex<Tracker<C>>>;

pub struct Tracker<C: Clock = SystemClock> {
    user: UserId,
    store: Box<dyn Store>,
    notifier: Box<dyn Notifier>,
    engine: TimerEngine<C>,
    settings: Settings,
    tasks: TaskLedger,
    sessions: SessionLog,
    offset: FixedOffset,
    notices: Vec<Notice>,
}

impl<C: Clock> Tracker<C> {
    /// Anonymous tracker backed by a fresh [`MemoryStore`].
    pub fn ephemeral(clock: C) -> Self {
        let settings = Settings::default();
        let engine = TimerEngine::new(settings.timer.clone(), clock);
        Self {
            user: UserId::anonymous(),
            store: Box::new(MemoryStore::new()),
            notifier: Box::new(LogNotifier),
            engine,
            settings,
            tasks: TaskLedger::new(),
            sessions: SessionLog::new(),
            offset: local_offset(),
            notices: Vec::new(),
        }
    }

    /// Load everything `user` has in `store`.
    ///
    /// # Errors
    /// Returns an error if any of the user's records cannot be read.
    pub fn load(user: UserId, store: Box<dyn Store>, clock: C) -> Result<Self> {
        let settings = store.load_settings(&user)?.unwrap_or_default();
        let tasks = TaskLedger::from_tasks(store.load_tasks(&user)?);
        let sessions = SessionLog::from_sessions(store.load_sessions(&user)?);

        let engine = match store.load_timer(&user)? {
            Some(state) => TimerEngine::restore(settings.timer.clone(), state, clock),
            None => TimerEngine::new(settings.timer.clone(), clock),
        };

        debug!(
            %user,
            tasks = tasks.tasks().len(),
            sessions = sessions.len(),
            "tracker loaded"
        );

        let mut tracker = Self {
            user,
            store,
            notifier: Box::new(LogNotifier),
            engine,
            settings,
            tasks,
            sessions,
            offset: local_offset(),
            notices: Vec::new(),
        };

        // A stored active task may have been deleted elsewhere.
        if let Some(id) = tracker.engine.active_task_id().map(str::to_string) {
            if tracker.tasks.get(&id).is_none() {
                tracker.engine.clear_active_task_if(&id);
            }
        }
        Ok(tracker)
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Offset used for calendar days in reports and CSV export.
    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    pub fn into_shared(self) -> SharedTracker<C> {
        Arc::new(Mutex::new(self))
    }

    pub fn user(&self) -> &UserId {
        &self.user
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.engine.clock().now()
    }

    // ── Timer ────────────────────────────────────────────────────────

    pub fn start(&mut self) -> Vec<Event> {
        let mut events = self.observe();
        if let Some(event) = self.engine.start() {
            events.push(event);
            self.save_timer();
        }
        events
    }

    pub fn pause(&mut self) -> Vec<Event> {
        let mut events = self.observe();
        if let Some(event) = self.engine.pause() {
            events.push(event);
            self.save_timer();
        }
        events
    }

    /// Rewind the current phase. Never records a session.
    pub fn reset(&mut self) -> Vec<Event> {
        let mut events = self.observe();
        events.extend(self.engine.reset());
        self.save_timer();
        events
    }

    /// Finish the current interval now, exactly as if it had expired.
    pub fn skip(&mut self) -> Vec<Event> {
        let mut events = self.observe();
        if let Some(done) = self.engine.skip() {
            events.push(self.handle_completion(done));
        }
        events
    }

    pub fn switch_mode(&mut self, phase: Phase) -> Vec<Event> {
        let mut events = self.observe();
        events.extend(self.engine.switch_mode(phase));
        self.save_timer();
        events
    }

    /// Observe the clock. Returns the completion event if a phase expired.
    pub fn tick(&mut self) -> Vec<Event> {
        self.observe()
    }

    /// Recompute from the deadline, e.g. when the host becomes visible again.
    pub fn refresh(&mut self) -> Event {
        self.observe();
        self.engine.snapshot()
    }

    /// Live timer state, remaining time recomputed from the deadline.
    pub fn state(&self) -> TimerState {
        let mut state = self.engine.state().clone();
        state.remaining_secs = self.engine.remaining_secs();
        state
    }

    pub fn snapshot(&self) -> Event {
        self.engine.snapshot()
    }

    fn observe(&mut self) -> Vec<Event> {
        match self.engine.tick() {
            Some(done) => vec![self.handle_completion(done)],
            None => Vec::new(),
        }
    }

    fn handle_completion(&mut self, done: Completion) -> Event {
        if done.phase == Phase::Work {
            if let Some(id) = done.task_id.as_deref() {
                match self.tasks.increment_completed(id) {
                    Ok(task) => {
                        let task = task.clone();
                        let result = self.store.update_task(&self.user, &task);
                        self.check(result, "save task progress");
                    }
                    Err(e) => debug!(task = id, error = %e, "active task vanished before completion"),
                }
            }
        }

        let task = done.task_id.as_deref().and_then(|id| self.tasks.get(id));
        let session = Session::from((&done, task));
        let result = self.store.create_session(&self.user, &session);
        self.check(result, "record session");
        let session_id = self.sessions.append(session).id.clone();
        self.save_timer();

        info!(
            user = %self.user,
            phase = %done.phase,
            minutes = done.duration_min,
            skipped = done.skipped,
            next = %done.next_phase,
            "interval completed"
        );

        let alert = Alert::new(done.phase, done.next_phase, done.skipped, &self.settings.sound);
        if let Err(e) = self.notifier.notify(&alert) {
            warn!(error = %e, "notifier failed");
        }

        Event::PhaseCompleted {
            phase: done.phase,
            duration_min: done.duration_min,
            skipped: done.skipped,
            next_phase: done.next_phase,
            next_duration_min: done.next_duration_min,
            auto_started: done.auto_started,
            session_id: Some(session_id),
            at: done.ended_at,
        }
    }

    // ── Settings ─────────────────────────────────────────────────────

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Replace the timer configuration.
    ///
    /// An invalid configuration is rejected and the previous one kept.
    pub fn set_config(&mut self, config: TimerConfig) -> Result<()> {
        self.observe();
        self.engine.set_config(config.clone())?;
        self.settings.timer = config;
        self.save_settings();
        self.save_timer();
        Ok(())
    }

    /// Change one setting by dot-path key, e.g. `timer.work_duration`.
    pub fn set_setting(&mut self, key: &str, value: &str) -> Result<&Settings> {
        let updated = self.settings.with_value(key, value)?;
        self.apply_settings(updated)
    }

    /// Restore every setting to its default.
    pub fn reset_settings(&mut self) -> Result<&Settings> {
        self.apply_settings(Settings::default())
    }

    fn apply_settings(&mut self, updated: Settings) -> Result<&Settings> {
        updated.validate()?;
        self.observe();
        if updated.timer != self.settings.timer {
            self.engine.set_config(updated.timer.clone())?;
            self.save_timer();
        }
        self.settings = updated;
        self.save_settings();
        Ok(&self.settings)
    }

    // ── Tasks ────────────────────────────────────────────────────────

    /// Tasks, newest first.
    pub fn tasks(&self) -> &[Task] {
        self.tasks.tasks()
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn add_task(&mut self, input: NewTask) -> Result<Task> {
        let now = self.now();
        let task = self.tasks.create(input, now)?.clone();
        let result = self.store.create_task(&self.user, &task);
        self.check(result, "save new task");
        debug!(task = %task.id, "task added");
        Ok(task)
    }

    pub fn update_task(&mut self, id: &str, patch: &TaskPatch) -> Result<Task> {
        let task = self.tasks.update(id, patch)?.clone();
        let result = self.store.update_task(&self.user, &task);
        self.check(result, "save task");
        Ok(task)
    }

    /// Delete a task. Recorded sessions keep its snapshotted name.
    pub fn delete_task(&mut self, id: &str) -> Result<Task> {
        self.observe();
        let task = self.tasks.delete(id)?;
        if self.engine.clear_active_task_if(id) {
            self.save_timer();
        }
        let result = self.store.delete_task(&self.user, id);
        self.check(result, "delete task");
        debug!(task = id, "task deleted");
        Ok(task)
    }

    pub fn toggle_task_done(&mut self, id: &str) -> Result<Task> {
        let task = self.tasks.toggle_done(id)?.clone();
        let result = self.store.update_task(&self.user, &task);
        self.check(result, "save task");
        Ok(task)
    }

    /// Select the task that work intervals are credited to, or clear it.
    pub fn set_active_task(&mut self, id: Option<&str>) -> Result<()> {
        if let Some(id) = id {
            if self.tasks.get(id).is_none() {
                return Err(CoreError::task_not_found(id));
            }
        }
        self.observe();
        self.engine.set_active_task(id.map(str::to_string));
        self.save_timer();
        Ok(())
    }

    pub fn active_task(&self) -> Option<&Task> {
        self.engine.active_task_id().and_then(|id| self.tasks.get(id))
    }

    pub fn projects(&self) -> Vec<String> {
        self.tasks.projects()
    }

    /// Open-task totals, finishing estimate at the current work duration.
    pub fn task_summary(&self) -> TaskSummary {
        self.tasks.summary(self.now(), self.settings.timer.work_duration)
    }

    // ── Sessions & reports ───────────────────────────────────────────

    /// Recorded sessions, oldest first.
    pub fn sessions(&self) -> &[Session] {
        self.sessions.sessions()
    }

    fn reporter(&self) -> Reporter {
        Reporter::new(self.now(), self.offset)
    }

    pub fn report(&self, period: Period) -> PeriodReport {
        self.reporter().report(self.sessions(), period)
    }

    pub fn rollup(&self, bucket: Bucket, within: Option<Period>) -> Vec<ProjectBucket> {
        self.reporter().rollup(self.sessions(), bucket, within)
    }

    pub fn history(&self, page: usize, per_page: usize) -> HistoryPage {
        stats::history(self.sessions(), page, per_page)
    }

    pub fn export_csv(&self) -> String {
        session::to_csv(self.sessions(), self.offset)
    }

    /// Drain queued notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    // ── Persistence ──────────────────────────────────────────────────

    fn save_timer(&mut self) {
        let result = self.store.save_timer(&self.user, &self.state());
        self.check(result, "save timer state");
    }

    fn save_settings(&mut self) {
        let result = self.store.save_settings(&self.user, &self.settings);
        self.check(result, "save settings");
    }

    fn check<T>(&mut self, result: std::result::Result<T, StorageError>, what: &str) {
        if let Err(e) = result {
            warn!(user = %self.user, error = %e, "failed to {what}");
            self.notices.push(Notice {
                at: self.now(),
                message: format!("Could not {what}: {e}"),
            });
        }
    }
}

fn local_offset() -> FixedOffset {
    Local::now().offset().fix()
}
