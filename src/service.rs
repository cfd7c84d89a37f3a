//! Task lifecycle manager.
//!
//! Orchestrates every state transition a potato can make — create, pass,
//! complete, delete, update — plus the live-heat read paths and the
//! active-set statistics. All mutations run inside a single store
//! transaction, so concurrent callers contend on the write lock and the
//! losing `complete` of a race observes `TaskNotFound`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{PotatoError, Result};
use crate::fields::{format_category, format_difficulty, Category, Difficulty, UserStatus};
use crate::game;
use crate::heat;
use crate::store::Store;
use crate::task::{ArchivedTask, NewTask, Task, TaskPatch};
use crate::users::{AchievementRecord, User};

pub const VALUE_MIN: i64 = 100;
pub const VALUE_MAX: i64 = 50000;
const TITLE_LEN: std::ops::RangeInclusive<usize> = 3..=100;
const DESCRIPTION_LEN: std::ops::RangeInclusive<usize> = 10..=500;

pub struct TaskService {
    store: Store,
    config: Config,
}

/// Optional conjunctive filters for task listings.
#[derive(Debug, Default, Clone)]
pub struct ListFilter {
    pub holder: Option<String>,
    pub category: Option<Category>,
}

/// Active-set statistics.
#[derive(Debug, Default)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub by_category: BTreeMap<String, usize>,
    pub by_user: BTreeMap<String, usize>,
    pub by_difficulty: BTreeMap<String, usize>,
    pub avg_temperature: f64,
    /// Temperature above 80.
    pub hot_tasks: usize,
    /// Temperature above 90.
    pub critical_tasks: usize,
    pub total_value: i64,
    pub potential_earnings: i64,
}

/// Preview of what the active set would pay out if completed now.
#[derive(Debug, Default)]
pub struct PotentialEarnings {
    pub total: i64,
    pub by_user: BTreeMap<String, i64>,
    pub epic_total: i64,
    pub total_tasks: usize,
    pub epic_tasks: usize,
}

impl TaskService {
    pub fn new(store: Store, config: Config) -> Self {
        TaskService { store, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Read-only snapshot access, for the reporting layer.
    pub fn store(&self) -> &Store {
        &self.store
    }

    fn require_roster(&self, user_id: &str) -> Result<()> {
        if self.config.is_roster_member(user_id) {
            Ok(())
        } else {
            Err(PotatoError::Validation(format!(
                "'{user_id}' is not a roster member"
            )))
        }
    }

    // --- write operations -------------------------------------------------

    pub fn create(&self, input: NewTask) -> Result<Task> {
        self.create_at(input, Utc::now())
    }

    pub fn create_at(&self, input: NewTask, now: DateTime<Utc>) -> Result<Task> {
        if !TITLE_LEN.contains(&input.title.chars().count()) {
            return Err(PotatoError::Validation(
                "title must be between 3 and 100 characters".into(),
            ));
        }
        if !DESCRIPTION_LEN.contains(&input.description.chars().count()) {
            return Err(PotatoError::Validation(
                "description must be between 10 and 500 characters".into(),
            ));
        }
        self.require_roster(&input.holder)?;

        let difficulty = input.difficulty.unwrap_or(Difficulty::Common);
        let value = match input.value {
            Some(v) if !(VALUE_MIN..=VALUE_MAX).contains(&v) => {
                return Err(PotatoError::Validation(format!(
                    "value must be between {VALUE_MIN} and {VALUE_MAX}, got {v}"
                )));
            }
            Some(v) => v,
            None => difficulty.default_value(),
        };
        let time_limit = match input.time_limit {
            Some(t) if t <= 0 => {
                return Err(PotatoError::Validation("time limit must be positive".into()));
            }
            Some(t) => t,
            None => heat::DEFAULT_TIME_LIMIT_SECS,
        };

        let task = Task {
            id: Uuid::new_v4(),
            title: input.title,
            description: input.description,
            category: input.category,
            difficulty,
            value,
            holder: input.holder,
            last_passer: None,
            pass_count: 0,
            combo: 0,
            stored_temperature: 0.0,
            time_limit,
            version: 0,
            created_at: now,
            updated_at: now,
        };

        self.store.update(|state| {
            state.tasks.push(task.clone());
            Ok(())
        })?;
        info!(id = %task.id, holder = %task.holder, "task created");
        Ok(task)
    }

    pub fn pass(&self, id: Uuid, from: &str, to: &str) -> Result<Task> {
        self.pass_at(id, from, to, Utc::now())
    }

    /// Hand the task off. The pass penalty is folded into
    /// `stored_temperature` so it never regresses between reads, and the
    /// combo counter increments when the task bounces straight back to
    /// whoever passed it last.
    pub fn pass_at(&self, id: Uuid, from: &str, to: &str, now: DateTime<Utc>) -> Result<Task> {
        self.require_roster(from)?;
        self.require_roster(to)?;

        self.store.update(|state| {
            let task = state.task_mut(id).ok_or(PotatoError::TaskNotFound(id))?;
            if task.holder != from {
                return Err(PotatoError::Validation(format!(
                    "'{from}' does not hold this task (current holder: '{}')",
                    task.holder
                )));
            }

            let current =
                heat::temperature(task.created_at, task.pass_count, task.stored_temperature, now);
            task.stored_temperature =
                (current + heat::PASS_PENALTY).min(heat::MAX_TEMPERATURE);
            task.combo = if task.last_passer.as_deref() == Some(to) {
                task.combo + 1
            } else {
                0
            };
            task.holder = to.to_string();
            task.last_passer = Some(from.to_string());
            task.pass_count += 1;
            task.version += 1;
            task.updated_at = now;

            debug!(id = %id, from, to, combo = task.combo, "task passed");
            Ok(task.clone())
        })
    }

    pub fn complete(
        &self,
        id: Uuid,
        completed_by: &str,
        earned_override: Option<i64>,
    ) -> Result<(ArchivedTask, Vec<AchievementRecord>)> {
        self.complete_at(id, completed_by, earned_override, Utc::now())
    }

    /// Snapshot the task into the archive and remove it from the active set,
    /// atomically. Credits the completing user with the game score as XP and
    /// runs the achievement check; newly earned badges come back alongside
    /// the archive record.
    pub fn complete_at(
        &self,
        id: Uuid,
        completed_by: &str,
        earned_override: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<(ArchivedTask, Vec<AchievementRecord>)> {
        self.require_roster(completed_by)?;
        let config = self.config.clone();

        self.store.update(|state| {
            let idx = state
                .tasks
                .iter()
                .position(|t| t.id == id)
                .ok_or(PotatoError::TaskNotFound(id))?;
            let task = state.tasks.remove(idx);

            let final_temperature =
                heat::temperature(task.created_at, task.pass_count, task.stored_temperature, now);
            let bonus_multiplier = heat::bonus_multiplier(final_temperature);
            let earned_value =
                earned_override.unwrap_or_else(|| heat::earned_value(task.value, final_temperature));
            let game_score = heat::game_score(earned_value);

            let archived = ArchivedTask {
                id: task.id,
                title: task.title,
                description: task.description,
                category: task.category,
                difficulty: task.difficulty,
                value: task.value,
                holder: task.holder,
                pass_count: task.pass_count,
                combo: task.combo,
                completed_by: completed_by.to_string(),
                completed_at: now,
                earned_value,
                final_temperature,
                bonus_multiplier,
                game_score,
                completion_time_ms: (now - task.created_at).num_milliseconds(),
                created_at: task.created_at,
            };
            state.archive.push(archived.clone());

            let user = state
                .user_mut(completed_by)
                .ok_or_else(|| PotatoError::UserNotFound(completed_by.to_string()))?;
            user.add_xp(game_score);
            user.potatoes_completed += 1;

            let awarded = game::check_and_award(state, &config, completed_by, now)?;
            info!(
                id = %id,
                by = completed_by,
                earned = earned_value,
                new_achievements = awarded.len(),
                "task completed"
            );
            Ok((archived, awarded))
        })
    }

    pub fn delete(&self, id: Uuid) -> Result<()> {
        self.store.update(|state| {
            let idx = state
                .tasks
                .iter()
                .position(|t| t.id == id)
                .ok_or(PotatoError::TaskNotFound(id))?;
            state.tasks.remove(idx);
            info!(id = %id, "task deleted");
            Ok(())
        })
    }

    /// Administrative removal of an archive record.
    pub fn delete_archived(&self, id: Uuid) -> Result<()> {
        self.store.update(|state| {
            let idx = state
                .archive
                .iter()
                .position(|t| t.id == id)
                .ok_or(PotatoError::TaskNotFound(id))?;
            state.archive.remove(idx);
            Ok(())
        })
    }

    pub fn update(&self, id: Uuid, patch: TaskPatch, expected_version: Option<u64>) -> Result<Task> {
        self.update_at(id, patch, expected_version, Utc::now())
    }

    /// Patch display/intake fields. When `expected_version` is supplied, a
    /// mismatch means someone else wrote first; the caller should re-read
    /// and retry.
    pub fn update_at(
        &self,
        id: Uuid,
        patch: TaskPatch,
        expected_version: Option<u64>,
        now: DateTime<Utc>,
    ) -> Result<Task> {
        if let Some(v) = patch.value {
            if !(VALUE_MIN..=VALUE_MAX).contains(&v) {
                return Err(PotatoError::Validation(format!(
                    "value must be between {VALUE_MIN} and {VALUE_MAX}, got {v}"
                )));
            }
        }
        if let Some(ref t) = patch.title {
            if !TITLE_LEN.contains(&t.chars().count()) {
                return Err(PotatoError::Validation(
                    "title must be between 3 and 100 characters".into(),
                ));
            }
        }
        if let Some(ref d) = patch.description {
            if !DESCRIPTION_LEN.contains(&d.chars().count()) {
                return Err(PotatoError::Validation(
                    "description must be between 10 and 500 characters".into(),
                ));
            }
        }

        self.store.update(|state| {
            let task = state.task_mut(id).ok_or(PotatoError::TaskNotFound(id))?;
            if let Some(expected) = expected_version {
                if task.version != expected {
                    return Err(PotatoError::Conflict {
                        id,
                        expected,
                        found: task.version,
                    });
                }
            }
            if let Some(title) = patch.title {
                task.title = title;
            }
            if let Some(description) = patch.description {
                task.description = description;
            }
            if let Some(category) = patch.category {
                task.category = category;
            }
            if let Some(difficulty) = patch.difficulty {
                task.difficulty = difficulty;
            }
            if let Some(value) = patch.value {
                task.value = value;
            }
            if let Some(time_limit) = patch.time_limit {
                task.time_limit = time_limit;
            }
            task.version += 1;
            task.updated_at = now;
            Ok(task.clone())
        })
    }

    // --- user operations --------------------------------------------------

    pub fn adjust_streak(&self, user_id: &str, reset: bool) -> Result<User> {
        self.require_roster(user_id)?;
        self.store.update(|state| {
            let user = state
                .user_mut(user_id)
                .ok_or_else(|| PotatoError::UserNotFound(user_id.to_string()))?;
            if reset {
                user.streak = 0;
            } else {
                user.streak += 1;
            }
            Ok(user.clone())
        })
    }

    pub fn set_status(&self, user_id: &str, status: UserStatus) -> Result<User> {
        self.require_roster(user_id)?;
        self.store.update(|state| {
            let user = state
                .user_mut(user_id)
                .ok_or_else(|| PotatoError::UserNotFound(user_id.to_string()))?;
            user.status = status;
            Ok(user.clone())
        })
    }

    pub fn check_achievements(&self, user_id: &str) -> Result<Vec<AchievementRecord>> {
        self.require_roster(user_id)?;
        let config = self.config.clone();
        self.store
            .update(|state| game::check_and_award(state, &config, user_id, Utc::now()))
    }

    // --- read operations --------------------------------------------------

    pub fn get(&self, id: Uuid) -> Option<Task> {
        self.store.read().task(id).cloned()
    }

    pub fn list(&self, filter: &ListFilter) -> Vec<Task> {
        self.store
            .read()
            .tasks
            .iter()
            .filter(|t| filter.holder.as_deref().map_or(true, |h| t.holder == h))
            .filter(|t| filter.category.map_or(true, |c| t.category == c))
            .cloned()
            .collect()
    }

    pub fn users(&self) -> Vec<User> {
        self.store.read().users.clone()
    }

    pub fn achievements_for(&self, user_id: &str) -> Vec<AchievementRecord> {
        self.store
            .read()
            .achievements
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn stats(&self, now: DateTime<Utc>) -> TaskStats {
        let state = self.store.read();
        let mut stats = TaskStats {
            total: state.tasks.len(),
            completed: state.archive.len(),
            ..TaskStats::default()
        };

        let mut temperature_sum = 0.0;
        for task in &state.tasks {
            let t = task.heat(now).temperature;
            temperature_sum += t;
            if t > 90.0 {
                stats.critical_tasks += 1;
            }
            if t > 80.0 {
                stats.hot_tasks += 1;
            }
            stats.total_value += task.value;
            stats.potential_earnings += task.potential_value(now);

            *stats
                .by_category
                .entry(format_category(task.category).to_string())
                .or_default() += 1;
            *stats
                .by_difficulty
                .entry(format_difficulty(task.difficulty).to_string())
                .or_default() += 1;
            *stats.by_user.entry(task.holder.clone()).or_default() += 1;
        }
        if !state.tasks.is_empty() {
            stats.avg_temperature = temperature_sum / state.tasks.len() as f64;
        }
        stats
    }

    pub fn potential_earnings(&self, now: DateTime<Utc>) -> PotentialEarnings {
        let state = self.store.read();
        let mut out = PotentialEarnings {
            total_tasks: state.tasks.len(),
            ..PotentialEarnings::default()
        };
        for task in &state.tasks {
            let potential = task.potential_value(now);
            out.total += potential;
            *out.by_user.entry(task.holder.clone()).or_default() += potential;
            if task.difficulty == Difficulty::Epic {
                out.epic_total += potential;
                out.epic_tasks += 1;
            }
        }
        out
    }
}
