//! JSON-file-backed repository for tasks, the archive, users and achievements.
//!
//! The whole persisted state is held in memory behind a single `RwLock`;
//! every mutation runs read-modify-write under the write lock and is flushed
//! to disk before the lock is released. That gives the two properties the
//! lifecycle layer relies on: writes to the same task are mutually exclusive,
//! and `complete`'s dual write (archive append + active remove) is atomic
//! from any reader's perspective.
//!
//! Files are written via temp + rename so a crash mid-write never leaves a
//! torn file. Writes are retried a bounded number of times with backoff
//! before surfacing `StorageUnavailable`.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{PotatoError, Result};
use crate::fields::UserStatus;
use crate::task::{ArchivedTask, Task};
use crate::users::{AchievementRecord, User};

const SAVE_ATTEMPTS: u32 = 3;
const SAVE_BACKOFF_MS: u64 = 50;

/// Everything the tracker persists: two independent task collections plus
/// user progression and achievement records.
#[derive(Debug, Default, Clone)]
pub struct State {
    pub tasks: Vec<Task>,
    pub archive: Vec<ArchivedTask>,
    pub users: Vec<User>,
    pub achievements: Vec<AchievementRecord>,
}

impl State {
    pub fn task(&self, id: uuid::Uuid) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn task_mut(&mut self, id: uuid::Uuid) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    pub fn user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn user_mut(&mut self, id: &str) -> Option<&mut User> {
        self.users.iter_mut().find(|u| u.id == id)
    }
}

pub struct Store {
    data_dir: PathBuf,
    state: RwLock<State>,
}

impl Store {
    /// Open the store, loading each collection from its file and seeding the
    /// user collection from the configured roster on first run.
    pub fn open(data_dir: &Path, config: &Config) -> Result<Self> {
        fs::create_dir_all(data_dir).map_err(|source| PotatoError::StorageUnavailable {
            path: data_dir.display().to_string(),
            source,
        })?;

        let mut state = State {
            tasks: load_collection(&data_dir.join("tasks.json"))?,
            archive: load_collection(&data_dir.join("archive.json"))?,
            users: load_collection(&data_dir.join("users.json"))?,
            achievements: load_collection(&data_dir.join("achievements.json"))?,
        };

        // Roster entries added to the config after first run get user records
        // on the next open; existing progression is never overwritten.
        for entry in &config.roster {
            if state.user(&entry.id).is_none() {
                debug!(user = %entry.id, "seeding roster user");
                state.users.push(User {
                    id: entry.id.clone(),
                    name: entry.name.clone(),
                    status: UserStatus::Active,
                    level: 1,
                    xp: 0,
                    potatoes_completed: 0,
                    streak: 0,
                });
            }
        }

        let store = Store {
            data_dir: data_dir.to_path_buf(),
            state: RwLock::new(state),
        };
        store.persist(&store.read())?;
        Ok(store)
    }

    /// Read-only access to a consistent snapshot of the state.
    pub fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Run a mutation under the write lock and flush to disk before
    /// releasing it. The mutation runs against a draft; if it fails, or the
    /// flush fails, the published state is untouched.
    pub fn update<T>(&self, f: impl FnOnce(&mut State) -> Result<T>) -> Result<T> {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        let mut draft = state.clone();
        let out = f(&mut draft)?;
        self.persist(&draft)?;
        *state = draft;
        Ok(out)
    }

    fn persist(&self, state: &State) -> Result<()> {
        save_collection(&self.data_dir.join("tasks.json"), &state.tasks)?;
        save_collection(&self.data_dir.join("archive.json"), &state.archive)?;
        save_collection(&self.data_dir.join("users.json"), &state.users)?;
        save_collection(&self.data_dir.join("achievements.json"), &state.achievements)?;
        Ok(())
    }
}

fn load_collection<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let buf = fs::read_to_string(path).map_err(|source| PotatoError::StorageUnavailable {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&buf).map_err(|source| PotatoError::CorruptData {
        path: path.display().to_string(),
        source,
    })
}

fn save_collection<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    let data = serde_json::to_string_pretty(items).map_err(|source| PotatoError::CorruptData {
        path: path.display().to_string(),
        source,
    })?;

    let mut last_err = None;
    for attempt in 1..=SAVE_ATTEMPTS {
        match write_atomic(path, data.as_bytes()) {
            Ok(()) => return Ok(()),
            Err(e) => {
                warn!(path = %path.display(), attempt, error = %e, "write failed");
                last_err = Some(e);
                std::thread::sleep(Duration::from_millis(SAVE_BACKOFF_MS * u64::from(attempt)));
            }
        }
    }
    Err(PotatoError::StorageUnavailable {
        path: path.display().to_string(),
        source: last_err.unwrap_or_else(|| std::io::Error::other("write failed")),
    })
}

/// Atomic-ish write via temp + rename.
fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    let mut f = File::create(&tmp)?;
    f.write_all(data)?;
    f.flush()?;
    fs::rename(tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{Category, Difficulty};
    use chrono::Utc;
    use uuid::Uuid;

    fn sample_task() -> Task {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            title: "Chase the Hendersons quote".into(),
            description: "Follow up on the outstanding quote before Friday.".into(),
            category: Category::Sales,
            difficulty: Difficulty::Common,
            value: 1000,
            holder: "ilan".into(),
            last_passer: None,
            pass_count: 0,
            combo: 0,
            stored_temperature: 0.0,
            time_limit: 3600,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn open_seeds_roster_users() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        let store = Store::open(dir.path(), &config).unwrap();
        assert_eq!(store.read().users.len(), 5);
        assert!(store.read().user("brandon").is_some());
    }

    #[test]
    fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        let task = sample_task();
        let id = task.id;
        {
            let store = Store::open(dir.path(), &config).unwrap();
            store
                .update(|state| {
                    state.tasks.push(task.clone());
                    Ok(())
                })
                .unwrap();
        }
        let store = Store::open(dir.path(), &config).unwrap();
        let state = store.read();
        assert_eq!(state.tasks.len(), 1);
        assert_eq!(state.task(id).unwrap().title, task.title);
    }

    #[test]
    fn failed_mutation_persists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        let store = Store::open(dir.path(), &config).unwrap();
        let err = store.update(|state| {
            state.tasks.push(sample_task());
            Err::<(), _>(PotatoError::Validation("boom".into()))
        });
        assert!(err.is_err());
        assert!(store.read().tasks.is_empty());
        let reopened = Store::open(dir.path(), &config).unwrap();
        assert!(reopened.read().tasks.is_empty());
    }
}
