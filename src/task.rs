//! Task data structures.
//!
//! `Task` is the active, circulating record; `ArchivedTask` is the immutable
//! snapshot taken at completion. Temperature is never stored on the active
//! record directly — only the offset captured at the latest pass — so every
//! read derives the live value via [`crate::heat`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fields::{Category, Difficulty, HeatTier};
use crate::heat;

/// A potato: a unit of work circulating among the roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub difficulty: Difficulty,
    /// Base monetary value, validated to [100, 50000] at intake.
    pub value: i64,
    /// Current owning user id.
    pub holder: String,
    /// Whoever passed it to the current holder, if it was ever passed.
    pub last_passer: Option<String>,
    #[serde(default)]
    pub pass_count: u32,
    #[serde(default)]
    pub combo: u32,
    /// Accumulated heat offset captured at the most recent pass, so the pass
    /// penalty does not regress between reads.
    #[serde(default)]
    pub stored_temperature: f64,
    /// Soft time budget in seconds.
    pub time_limit: i64,
    /// Bumped on every write; checked on optimistic updates.
    #[serde(default)]
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Live heat reading for a task at a particular instant.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Heat {
    pub temperature: f64,
    pub bonus_multiplier: f64,
    pub tier: HeatTier,
    pub time_left: i64,
}

impl Task {
    /// Derive the live heat fields as of `now`.
    pub fn heat(&self, now: DateTime<Utc>) -> Heat {
        let temperature =
            heat::temperature(self.created_at, self.pass_count, self.stored_temperature, now);
        Heat {
            temperature,
            bonus_multiplier: heat::bonus_multiplier(temperature),
            tier: HeatTier::for_temperature(temperature),
            time_left: heat::time_left(self.created_at, self.time_limit, now),
        }
    }

    /// Potential (preview) value of this task as of `now`.
    pub fn potential_value(&self, now: DateTime<Utc>) -> i64 {
        heat::potential_value(self.value, self.heat(now).temperature, self.difficulty)
    }
}

/// Snapshot of a completed task. Immutable except for administrative delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivedTask {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub difficulty: Difficulty,
    pub value: i64,
    pub holder: String,
    pub pass_count: u32,
    pub combo: u32,
    pub completed_by: String,
    pub completed_at: DateTime<Utc>,
    /// Final payout: `floor(value * bonus_multiplier)`.
    pub earned_value: i64,
    pub final_temperature: f64,
    pub bonus_multiplier: f64,
    /// `earned_value / 10`.
    pub game_score: i64,
    /// Creation-to-completion duration in milliseconds.
    pub completion_time_ms: i64,
    pub created_at: DateTime<Utc>,
}

/// Validated-at-intake input for task creation.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub difficulty: Option<Difficulty>,
    pub value: Option<i64>,
    pub holder: String,
    pub time_limit: Option<i64>,
}

/// Field-level patch for task updates. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub difficulty: Option<Difficulty>,
    pub value: Option<i64>,
    pub time_limit: Option<i64>,
}
