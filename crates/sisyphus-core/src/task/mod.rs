//! Tasks and the task ledger.
//!
//! A task estimates how many work intervals it needs and counts the ones
//! actually spent on it. The counter is bumped automatically when a work
//! interval completes while the task is active; it is never lowered except
//! by an explicit edit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, ValidationError};

/// Project name used when a task has none.
pub const NO_PROJECT: &str = "No Project";

fn default_project() -> String {
    NO_PROJECT.to_string()
}

fn default_estimate() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier, assigned at creation
    pub id: String,
    #[serde(default = "default_project")]
    pub project_name: String,
    pub title: String,
    #[serde(default)]
    pub notes: String,
    /// Planned number of work intervals (>= 1)
    #[serde(default = "default_estimate")]
    pub estimated_intervals: u32,
    /// Work intervals completed against this task
    #[serde(default)]
    pub completed_intervals: u32,
    #[serde(default)]
    pub is_done: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    #[serde(default)]
    pub project_name: Option<String>,
    pub title: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default = "default_estimate")]
    pub estimated_intervals: u32,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            project_name: None,
            title: title.into(),
            notes: String::new(),
            estimated_intervals: 1,
        }
    }

    pub fn project(mut self, name: impl Into<String>) -> Self {
        self.project_name = Some(name.into());
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn estimate(mut self, intervals: u32) -> Self {
        self.estimated_intervals = intervals;
        self
    }
}

/// Partial update. `None` fields are left unchanged.
///
/// `id` exists so that a patch carrying an id can be rejected rather than
/// silently ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_intervals: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_intervals: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_done: Option<bool>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        *self == TaskPatch::default()
    }
}

/// Totals over the tasks that are not done yet.
///
/// `estimated_finish` is when the outstanding intervals would be done if
/// they ran back to back at the configured work duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub open_tasks: usize,
    pub estimated_intervals: u64,
    pub completed_intervals: u64,
    pub estimated_finish: DateTime<Utc>,
}

fn normalize_project(name: Option<&str>) -> String {
    match name.map(str::trim) {
        Some(n) if !n.is_empty() => n.to_string(),
        _ => default_project(),
    }
}

fn check_title(title: &str) -> Result<String, ValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty("title"));
    }
    Ok(trimmed.to_string())
}

fn check_estimate(estimate: u32) -> Result<u32, ValidationError> {
    if estimate == 0 {
        return Err(ValidationError::OutOfRange {
            field: "estimated_intervals",
            min: 1,
            max: u32::MAX,
            value: estimate,
        });
    }
    Ok(estimate)
}

impl Task {
    /// Build a validated task with a fresh id.
    pub fn create(input: NewTask, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        Ok(Task {
            id: format!("task-{}-{}", now.timestamp(), uuid::Uuid::new_v4()),
            project_name: normalize_project(input.project_name.as_deref()),
            title: check_title(&input.title)?,
            notes: input.notes,
            estimated_intervals: check_estimate(input.estimated_intervals)?,
            completed_intervals: 0,
            is_done: false,
            created_at: now,
        })
    }

    /// Apply `patch`, all-or-nothing.
    pub fn apply(&mut self, patch: &TaskPatch) -> Result<(), ValidationError> {
        if let Some(id) = &patch.id {
            if *id != self.id {
                return Err(ValidationError::Immutable("id"));
            }
        }
        let title = patch.title.as_deref().map(check_title).transpose()?;
        let estimate = patch.estimated_intervals.map(check_estimate).transpose()?;

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(estimate) = estimate {
            self.estimated_intervals = estimate;
        }
        if let Some(project) = &patch.project_name {
            self.project_name = normalize_project(Some(project));
        }
        if let Some(notes) = &patch.notes {
            self.notes = notes.clone();
        }
        if let Some(completed) = patch.completed_intervals {
            self.completed_intervals = completed;
        }
        if let Some(done) = patch.is_done {
            self.is_done = done;
        }
        Ok(())
    }

}

/// In-memory collection of one user's tasks, newest first.
#[derive(Debug, Clone, Default)]
pub struct TaskLedger {
    tasks: Vec<Task>,
}

impl TaskLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from stored tasks, newest first.
    pub fn from_tasks(mut tasks: Vec<Task>) -> Self {
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Self { tasks }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Task, CoreError> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| CoreError::task_not_found(id))
    }

    pub fn create(&mut self, input: NewTask, now: DateTime<Utc>) -> Result<&Task, CoreError> {
        let task = Task::create(input, now)?;
        self.tasks.insert(0, task);
        Ok(&self.tasks[0])
    }

    pub fn update(&mut self, id: &str, patch: &TaskPatch) -> Result<&Task, CoreError> {
        let task = self.get_mut(id)?;
        task.apply(patch)?;
        Ok(&*task)
    }

    pub fn delete(&mut self, id: &str) -> Result<Task, CoreError> {
        let idx = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| CoreError::task_not_found(id))?;
        Ok(self.tasks.remove(idx))
    }

    pub fn toggle_done(&mut self, id: &str) -> Result<&Task, CoreError> {
        let task = self.get_mut(id)?;
        task.is_done = !task.is_done;
        Ok(&*task)
    }

    /// Count one more completed work interval against `id`.
    pub fn increment_completed(&mut self, id: &str) -> Result<&Task, CoreError> {
        let task = self.get_mut(id)?;
        task.completed_intervals = task.completed_intervals.saturating_add(1);
        Ok(&*task)
    }

    /// Distinct named projects, sorted.
    pub fn projects(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tasks
            .iter()
            .map(|t| t.project_name.clone())
            .filter(|p| !p.is_empty() && p != NO_PROJECT)
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Totals over open tasks. Sums saturate instead of overflowing.
    pub fn summary(&self, now: DateTime<Utc>, work_minutes: u32) -> TaskSummary {
        let mut open_tasks = 0usize;
        let mut estimated = 0u64;
        let mut completed = 0u64;
        let mut remaining = 0u64;
        for t in self.tasks.iter().filter(|t| !t.is_done) {
            open_tasks += 1;
            estimated = estimated.saturating_add(u64::from(t.estimated_intervals));
            completed = completed.saturating_add(u64::from(t.completed_intervals));
            remaining = remaining.saturating_add(u64::from(
                t.estimated_intervals.saturating_sub(t.completed_intervals),
            ));
        }
        TaskSummary {
            open_tasks,
            estimated_intervals: estimated,
            completed_intervals: completed,
            estimated_finish: finish_after(now, remaining.saturating_mul(u64::from(work_minutes))),
        }
    }
}

fn finish_after(now: DateTime<Utc>, minutes: u64) -> DateTime<Utc> {
    i64::try_from(minutes)
        .ok()
        .and_then(chrono::Duration::try_minutes)
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 9, 0, 0).unwrap()
    }

    #[test]
    fn create_assigns_defaults() {
        let mut ledger = TaskLedger::new();
        let task = ledger.create(NewTask::new("  Write report "), now()).unwrap();
        assert!(task.id.starts_with("task-"));
        assert_eq!(task.title, "Write report");
        assert_eq!(task.project_name, NO_PROJECT);
        assert_eq!(task.completed_intervals, 0);
        assert!(!task.is_done);
    }

    #[test]
    fn create_rejects_blank_title_and_zero_estimate() {
        let mut ledger = TaskLedger::new();
        assert!(ledger.create(NewTask::new("   "), now()).is_err());
        assert!(ledger.create(NewTask::new("x").estimate(0), now()).is_err());
        assert!(ledger.tasks().is_empty());
    }

    #[test]
    fn update_rejects_id_change_without_partial_apply() {
        let mut ledger = TaskLedger::new();
        let id = ledger.create(NewTask::new("a"), now()).unwrap().id.clone();
        let patch = TaskPatch {
            id: Some("other".into()),
            title: Some("b".into()),
            ..TaskPatch::default()
        };
        let err = ledger.update(&id, &patch).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::Immutable("id"))));
        assert_eq!(ledger.get(&id).unwrap().title, "a");
    }

    #[test]
    fn update_applies_fields() {
        let mut ledger = TaskLedger::new();
        let id = ledger.create(NewTask::new("a"), now()).unwrap().id.clone();
        let patch = TaskPatch {
            project_name: Some("Thesis".into()),
            estimated_intervals: Some(3),
            completed_intervals: Some(1),
            ..TaskPatch::default()
        };
        let task = ledger.update(&id, &patch).unwrap();
        assert_eq!(task.project_name, "Thesis");
        assert_eq!(task.estimated_intervals, 3);
        assert_eq!(task.completed_intervals, 1);
    }

    #[test]
    fn missing_ids_report_not_found() {
        let mut ledger = TaskLedger::new();
        assert!(ledger.delete("nope").unwrap_err().is_not_found());
        assert!(ledger.toggle_done("nope").unwrap_err().is_not_found());
        assert!(ledger.increment_completed("nope").unwrap_err().is_not_found());
    }

    #[test]
    fn toggle_and_increment() {
        let mut ledger = TaskLedger::new();
        let id = ledger.create(NewTask::new("a"), now()).unwrap().id.clone();
        assert!(ledger.toggle_done(&id).unwrap().is_done);
        assert!(!ledger.toggle_done(&id).unwrap().is_done);
        ledger.increment_completed(&id).unwrap();
        assert_eq!(ledger.increment_completed(&id).unwrap().completed_intervals, 2);
    }

    #[test]
    fn projects_are_distinct_and_skip_default() {
        let mut ledger = TaskLedger::new();
        ledger.create(NewTask::new("a").project("Zeta"), now()).unwrap();
        ledger.create(NewTask::new("b").project("Alpha"), now()).unwrap();
        ledger.create(NewTask::new("c").project("Zeta"), now()).unwrap();
        ledger.create(NewTask::new("d"), now()).unwrap();
        assert_eq!(ledger.projects(), vec!["Alpha".to_string(), "Zeta".to_string()]);
    }

    #[test]
    fn summary_counts_open_tasks_only() {
        let mut ledger = TaskLedger::new();
        let a = ledger.create(NewTask::new("a").estimate(3), now()).unwrap().id.clone();
        let b = ledger.create(NewTask::new("b").estimate(2), now()).unwrap().id.clone();
        ledger.increment_completed(&a).unwrap();
        ledger.toggle_done(&b).unwrap();
        let s = ledger.summary(now(), 25);
        assert_eq!(s.open_tasks, 1);
        assert_eq!(s.estimated_intervals, 3);
        assert_eq!(s.completed_intervals, 1);
        assert_eq!(s.estimated_finish, now() + chrono::Duration::minutes(50));
    }

    #[test]
    fn summary_totals_do_not_overflow() {
        let mut ledger = TaskLedger::new();
        ledger.create(NewTask::new("huge").estimate(u32::MAX), now()).unwrap();
        ledger.create(NewTask::new("small").estimate(2), now()).unwrap();
        let s = ledger.summary(now(), 25);
        assert_eq!(s.open_tasks, 2);
        assert_eq!(s.estimated_intervals, u64::from(u32::MAX) + 2);
        assert_eq!(s.completed_intervals, 0);
        assert!(s.estimated_finish > now());
    }

    #[test]
    fn estimated_finish_ignores_overspent_tasks() {
        let mut ledger = TaskLedger::new();
        let a = ledger.create(NewTask::new("a").estimate(1), now()).unwrap().id.clone();
        ledger.increment_completed(&a).unwrap();
        ledger.increment_completed(&a).unwrap();
        ledger.create(NewTask::new("b").estimate(2), now()).unwrap();
        let s = ledger.summary(now(), 30);
        assert_eq!(s.completed_intervals, 2);
        assert_eq!(s.estimated_finish, now() + chrono::Duration::minutes(60));
    }

    #[test]
    fn estimated_finish_saturates_at_max_time() {
        let mut ledger = TaskLedger::new();
        ledger.create(NewTask::new("a").estimate(u32::MAX), now()).unwrap();
        ledger.create(NewTask::new("b").estimate(u32::MAX), now()).unwrap();
        let s = ledger.summary(DateTime::<Utc>::MAX_UTC, 60);
        assert_eq!(s.estimated_finish, DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn patch_json_rejects_unknown_fields() {
        assert!(serde_json::from_str::<TaskPatch>(r#"{"colour":"red"}"#).is_err());
        let p: TaskPatch = serde_json::from_str(r#"{"title":"x"}"#).unwrap();
        assert_eq!(p.title.as_deref(), Some("x"));
    }
}
