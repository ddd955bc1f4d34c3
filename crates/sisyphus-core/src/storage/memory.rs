//! In-process store for anonymous use and tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{Store, UserId};
use crate::error::StorageError;
use crate::session::Session;
use crate::settings::Settings;
use crate::task::Task;
use crate::timer::TimerState;

#[derive(Debug, Default)]
struct UserData {
    tasks: Vec<Task>,
    sessions: Vec<Session>,
    settings: Option<Settings>,
    timer: Option<TimerState>,
}

/// Keeps everything in memory. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: Mutex<HashMap<UserId, UserData>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn users(&self) -> MutexGuard<'_, HashMap<UserId, UserData>> {
        self.users.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn missing_task(id: &str) -> StorageError {
    StorageError::Missing {
        kind: "task",
        id: id.to_string(),
    }
}

impl Store for MemoryStore {
    fn load_tasks(&self, user: &UserId) -> Result<Vec<Task>, StorageError> {
        Ok(self
            .users()
            .get(user)
            .map(|d| d.tasks.clone())
            .unwrap_or_default())
    }

    fn create_task(&self, user: &UserId, task: &Task) -> Result<Task, StorageError> {
        let mut users = self.users();
        let data = users.entry(user.clone()).or_default();
        if data.tasks.iter().any(|t| t.id == task.id) {
            return Err(StorageError::QueryFailed(format!(
                "task {} already exists",
                task.id
            )));
        }
        data.tasks.push(task.clone());
        Ok(task.clone())
    }

    fn update_task(&self, user: &UserId, task: &Task) -> Result<(), StorageError> {
        let mut users = self.users();
        let slot = users
            .get_mut(user)
            .and_then(|d| d.tasks.iter_mut().find(|t| t.id == task.id))
            .ok_or_else(|| missing_task(&task.id))?;
        *slot = task.clone();
        Ok(())
    }

    fn delete_task(&self, user: &UserId, id: &str) -> Result<(), StorageError> {
        let mut users = self.users();
        let data = users.get_mut(user).ok_or_else(|| missing_task(id))?;
        let before = data.tasks.len();
        data.tasks.retain(|t| t.id != id);
        if data.tasks.len() == before {
            return Err(missing_task(id));
        }
        Ok(())
    }

    fn load_sessions(&self, user: &UserId) -> Result<Vec<Session>, StorageError> {
        Ok(self
            .users()
            .get(user)
            .map(|d| d.sessions.clone())
            .unwrap_or_default())
    }

    fn create_session(&self, user: &UserId, session: &Session) -> Result<Session, StorageError> {
        self.users()
            .entry(user.clone())
            .or_default()
            .sessions
            .push(session.clone());
        Ok(session.clone())
    }

    fn load_settings(&self, user: &UserId) -> Result<Option<Settings>, StorageError> {
        Ok(self.users().get(user).and_then(|d| d.settings.clone()))
    }

    fn save_settings(&self, user: &UserId, settings: &Settings) -> Result<(), StorageError> {
        self.users().entry(user.clone()).or_default().settings = Some(settings.clone());
        Ok(())
    }

    fn load_timer(&self, user: &UserId) -> Result<Option<TimerState>, StorageError> {
        Ok(self.users().get(user).and_then(|d| d.timer.clone()))
    }

    fn save_timer(&self, user: &UserId, state: &TimerState) -> Result<(), StorageError> {
        self.users().entry(user.clone()).or_default().timer = Some(state.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::NewTask;
    use chrono::Utc;

    #[test]
    fn users_are_isolated() {
        let store = MemoryStore::new();
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");
        let task = Task::create(NewTask::new("Write"), Utc::now()).unwrap();
        store.create_task(&alice, &task).unwrap();

        assert_eq!(store.load_tasks(&alice).unwrap().len(), 1);
        assert!(store.load_tasks(&bob).unwrap().is_empty());
    }

    #[test]
    fn update_and_delete_missing_task_fail() {
        let store = MemoryStore::new();
        let user = UserId::anonymous();
        let task = Task::create(NewTask::new("Write"), Utc::now()).unwrap();

        assert!(matches!(
            store.update_task(&user, &task),
            Err(StorageError::Missing { .. })
        ));
        assert!(matches!(
            store.delete_task(&user, &task.id),
            Err(StorageError::Missing { .. })
        ));
    }

    #[test]
    fn settings_default_to_none() {
        let store = MemoryStore::new();
        let user = UserId::anonymous();
        assert!(store.load_settings(&user).unwrap().is_none());
        store.save_settings(&user, &Settings::default()).unwrap();
        assert_eq!(store.load_settings(&user).unwrap(), Some(Settings::default()));
    }
}
