//! Roster-backed user state.
//!
//! The roster itself is configuration (see [`crate::config`]); this module
//! holds the mutable per-user progression fields and the achievement record
//! shape. XP and level only change through the lifecycle manager and the
//! achievement tracker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fields::UserStatus;

/// XP required per level. `level = xp / LEVEL_THRESHOLD + 1`.
pub const LEVEL_THRESHOLD: i64 = 250;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub status: UserStatus,
    pub level: u32,
    pub xp: i64,
    pub potatoes_completed: u32,
    pub streak: u32,
}

impl User {
    /// Add XP and recompute level. Level never decreases, even if XP
    /// bookkeeping is later corrected downward.
    pub fn add_xp(&mut self, amount: i64) {
        self.xp += amount;
        let derived = (self.xp.max(0) / LEVEL_THRESHOLD) as u32 + 1;
        self.level = self.level.max(derived);
    }
}

/// One-time badge grant. At most one record exists per
/// (user_id, achievement_id) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AchievementRecord {
    pub id: Uuid,
    pub user_id: String,
    pub achievement_id: String,
    pub achievement_name: String,
    pub awarded_at: DateTime<Utc>,
}
