//! Session log.
//!
//! One immutable [`Session`] per completed (or skipped) phase. Project and
//! task names are copied at recording time, so later edits or deletion of
//! the task never rewrite history.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::task::{Task, NO_PROJECT};
use crate::timer::{Completion, Phase};

fn default_project() -> String {
    NO_PROJECT.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    #[serde(default, alias = "taskId")]
    pub task_id: Option<String>,
    /// Project name at the time of recording
    #[serde(default = "default_project")]
    pub project_name: String,
    /// Task title at the time of recording
    #[serde(default)]
    pub task_name: Option<String>,
    #[serde(rename = "type")]
    pub phase: Phase,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: u32,
}

impl Session {
    pub fn is_work(&self) -> bool {
        self.phase == Phase::Work
    }
}

/// Materialize a session from a finished interval.
///
/// `task` is the active task looked up at completion time, if it still exists.
pub fn record_completion(
    phase: Phase,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    duration_minutes: u32,
    task: Option<&Task>,
) -> Session {
    Session {
        id: uuid::Uuid::new_v4().to_string(),
        task_id: task.map(|t| t.id.clone()),
        project_name: task
            .map(|t| t.project_name.clone())
            .unwrap_or_else(default_project),
        task_name: task.map(|t| t.title.clone()),
        phase,
        start_time,
        end_time,
        duration_minutes,
    }
}

impl From<(&Completion, Option<&Task>)> for Session {
    fn from((done, task): (&Completion, Option<&Task>)) -> Self {
        record_completion(done.phase, done.started_at, done.ended_at, done.duration_min, task)
    }
}

/// Append-only log of one user's sessions, in recording order.
#[derive(Debug, Clone, Default)]
pub struct SessionLog {
    sessions: Vec<Session>,
}

impl SessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from stored sessions, ordered by start time.
    pub fn from_sessions(mut sessions: Vec<Session>) -> Self {
        sessions.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        Self { sessions }
    }

    pub fn append(&mut self, session: Session) -> &Session {
        self.sessions.push(session);
        &self.sessions[self.sessions.len() - 1]
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Number of completed work intervals in the log.
    pub fn work_count(&self) -> usize {
        self.sessions.iter().filter(|s| s.is_work()).count()
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Render sessions as CSV, one row per session, times in `offset`.
pub fn to_csv(sessions: &[Session], offset: FixedOffset) -> String {
    let mut out = String::from("Date,Start Time,End Time,Duration (min),Type,Project,Task\n");
    for s in sessions {
        let start = s.start_time.with_timezone(&offset);
        let end = s.end_time.with_timezone(&offset);
        let row = [
            start.format("%Y-%m-%d").to_string(),
            start.format("%H:%M:%S").to_string(),
            end.format("%H:%M:%S").to_string(),
            s.duration_minutes.to_string(),
            s.phase.as_str().to_string(),
            csv_field(&s.project_name),
            csv_field(s.task_name.as_deref().unwrap_or("")),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}
