//! SQLite-backed store at `<data_dir>/sisyphus.db`.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{migrations, Store, UserId};
use crate::error::StorageError;
use crate::session::Session;
use crate::settings::Settings;
use crate::task::Task;
use crate::timer::{Phase, TimerState};

/// SQLite database holding every user's records.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and migrate it.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "database opened");
        Self::with_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory().map_err(|source| StorageError::OpenFailed {
            path: ":memory:".into(),
            source,
        })?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        migrations::migrate(&conn).map_err(|e| StorageError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    fn load_document<T: DeserializeOwned>(
        &self,
        table: &'static str,
        user: &UserId,
    ) -> Result<Option<T>, StorageError> {
        let sql = format!("SELECT body FROM {table} WHERE user_id = ?1");
        let body: Option<String> = self
            .conn
            .query_row(&sql, [user.as_str()], |row| row.get(0))
            .optional()?;
        body.map(|b| {
            serde_json::from_str(&b).map_err(|e| StorageError::Corrupt {
                table,
                message: e.to_string(),
            })
        })
        .transpose()
    }

    fn save_document<T: serde::Serialize>(
        &self,
        table: &'static str,
        user: &UserId,
        value: &T,
    ) -> Result<(), StorageError> {
        let body = serde_json::to_string(value).map_err(|e| StorageError::Corrupt {
            table,
            message: e.to_string(),
        })?;
        let sql = format!(
            "INSERT INTO {table} (user_id, body) VALUES (?1, ?2)
             ON CONFLICT(user_id) DO UPDATE SET body = excluded.body"
        );
        self.conn.execute(&sql, params![user.as_str(), body])?;
        Ok(())
    }
}

fn parse_time(table: &'static str, raw: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Corrupt {
            table,
            message: format!("bad timestamp '{raw}': {e}"),
        })
}

fn missing_task(id: &str) -> StorageError {
    StorageError::Missing {
        kind: "task",
        id: id.to_string(),
    }
}

type TaskRow = (String, String, String, String, u32, u32, bool, String);

type SessionRow = (
    String,
    Option<String>,
    String,
    Option<String>,
    String,
    String,
    String,
    u32,
);

impl Store for SqliteStore {
    fn load_tasks(&self, user: &UserId) -> Result<Vec<Task>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, project_name, title, notes, estimated_intervals,
                    completed_intervals, is_done, created_at
             FROM tasks WHERE user_id = ?1
             ORDER BY created_at DESC",
        )?;
        let rows = stmt
            .query_map([user.as_str()], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                    row.get(7)?,
                ))
            })?
            .collect::<Result<Vec<TaskRow>, _>>()?;

        rows.into_iter()
            .map(
                |(id, project_name, title, notes, estimated, completed, is_done, created)| {
                    Ok(Task {
                        id,
                        project_name,
                        title,
                        notes,
                        estimated_intervals: estimated,
                        completed_intervals: completed,
                        is_done,
                        created_at: parse_time("tasks", &created)?,
                    })
                },
            )
            .collect()
    }

    fn create_task(&self, user: &UserId, task: &Task) -> Result<Task, StorageError> {
        self.conn.execute(
            "INSERT INTO tasks (id, user_id, project_name, title, notes,
                                estimated_intervals, completed_intervals, is_done, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                task.id,
                user.as_str(),
                task.project_name,
                task.title,
                task.notes,
                task.estimated_intervals,
                task.completed_intervals,
                task.is_done,
                task.created_at.to_rfc3339(),
            ],
        )?;
        Ok(task.clone())
    }

    fn update_task(&self, user: &UserId, task: &Task) -> Result<(), StorageError> {
        let changed = self.conn.execute(
            "UPDATE tasks
             SET project_name = ?3, title = ?4, notes = ?5, estimated_intervals = ?6,
                 completed_intervals = ?7, is_done = ?8
             WHERE id = ?1 AND user_id = ?2",
            params![
                task.id,
                user.as_str(),
                task.project_name,
                task.title,
                task.notes,
                task.estimated_intervals,
                task.completed_intervals,
                task.is_done,
            ],
        )?;
        if changed == 0 {
            return Err(missing_task(&task.id));
        }
        Ok(())
    }

    fn delete_task(&self, user: &UserId, id: &str) -> Result<(), StorageError> {
        let changed = self.conn.execute(
            "DELETE FROM tasks WHERE id = ?1 AND user_id = ?2",
            params![id, user.as_str()],
        )?;
        if changed == 0 {
            return Err(missing_task(id));
        }
        Ok(())
    }

    fn load_sessions(&self, user: &UserId) -> Result<Vec<Session>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, task_id, project_name, task_name, phase,
                    start_time, end_time, duration_minutes
             FROM sessions WHERE user_id = ?1
             ORDER BY start_time ASC",
        )?;
        let rows = stmt
            .query_map([user.as_str()], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                    row.get(7)?,
                ))
            })?
            .collect::<Result<Vec<SessionRow>, _>>()?;

        rows.into_iter()
            .map(
                |(id, task_id, project_name, task_name, phase, start, end, minutes)| {
                    let phase: Phase = phase.parse().map_err(|e: String| StorageError::Corrupt {
                        table: "sessions",
                        message: e,
                    })?;
                    Ok(Session {
                        id,
                        task_id,
                        project_name,
                        task_name,
                        phase,
                        start_time: parse_time("sessions", &start)?,
                        end_time: parse_time("sessions", &end)?,
                        duration_minutes: minutes,
                    })
                },
            )
            .collect()
    }

    fn create_session(&self, user: &UserId, session: &Session) -> Result<Session, StorageError> {
        self.conn.execute(
            "INSERT INTO sessions (id, user_id, task_id, project_name, task_name, phase,
                                   start_time, end_time, duration_minutes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                session.id,
                user.as_str(),
                session.task_id,
                session.project_name,
                session.task_name,
                session.phase.as_str(),
                session.start_time.to_rfc3339(),
                session.end_time.to_rfc3339(),
                session.duration_minutes,
            ],
        )?;
        Ok(session.clone())
    }

    fn load_settings(&self, user: &UserId) -> Result<Option<Settings>, StorageError> {
        self.load_document("settings", user)
    }

    fn save_settings(&self, user: &UserId, settings: &Settings) -> Result<(), StorageError> {
        self.save_document("settings", user, settings)
    }

    fn load_timer(&self, user: &UserId) -> Result<Option<TimerState>, StorageError> {
        self.load_document("timer_state", user)
    }

    fn save_timer(&self, user: &UserId, state: &TimerState) -> Result<(), StorageError> {
        self.save_document("timer_state", user, state)
    }
}
