//! Achievements and XP progression.
//!
//! A fixed set of threshold predicates is evaluated against current user
//! state; every predicate that is newly satisfied mints exactly one record
//! and grants a flat XP bonus. The check is idempotent: held badges are
//! skipped silently, so re-running against unchanged state awards nothing.
//! The lower-level [`award`] is strict and refuses duplicates.

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{PotatoError, Result};
use crate::store::State;
use crate::users::AchievementRecord;

struct AchievementDef {
    id: &'static str,
    name: &'static str,
    satisfied: fn(&Progress) -> bool,
}

/// User state the predicates look at.
struct Progress {
    completed: usize,
    level: u32,
    xp: i64,
    streak: u32,
}

const ACHIEVEMENTS: &[AchievementDef] = &[
    AchievementDef {
        id: "first_task",
        name: "First Task Completed",
        satisfied: |p| p.completed >= 1,
    },
    AchievementDef {
        id: "task_master",
        name: "Task Master (10 tasks)",
        satisfied: |p| p.completed >= 10,
    },
    AchievementDef {
        id: "level_5",
        name: "Level 5 Reached",
        satisfied: |p| p.level >= 5,
    },
    AchievementDef {
        id: "xp_1000",
        name: "1000 XP Earned",
        satisfied: |p| p.xp >= 1000,
    },
    AchievementDef {
        id: "streak_7",
        name: "7 Day Streak",
        satisfied: |p| p.streak >= 7,
    },
];

fn holds(state: &State, user_id: &str, achievement_id: &str) -> bool {
    state
        .achievements
        .iter()
        .any(|a| a.user_id == user_id && a.achievement_id == achievement_id)
}

/// Grant a single achievement. Fails with `DuplicateAchievement` if the user
/// already holds it; callers that expect repeated attempts should go through
/// [`check_and_award`] instead.
pub fn award(
    state: &mut State,
    config: &Config,
    user_id: &str,
    achievement_id: &str,
    achievement_name: &str,
    now: DateTime<Utc>,
) -> Result<AchievementRecord> {
    if holds(state, user_id, achievement_id) {
        return Err(PotatoError::DuplicateAchievement {
            user_id: user_id.to_string(),
            achievement_id: achievement_id.to_string(),
        });
    }
    let user = state
        .user_mut(user_id)
        .ok_or_else(|| PotatoError::UserNotFound(user_id.to_string()))?;
    user.add_xp(config.achievement_xp);

    let record = AchievementRecord {
        id: Uuid::new_v4(),
        user_id: user_id.to_string(),
        achievement_id: achievement_id.to_string(),
        achievement_name: achievement_name.to_string(),
        awarded_at: now,
    };
    info!(user = user_id, achievement = achievement_id, "achievement awarded");
    state.achievements.push(record.clone());
    Ok(record)
}

/// Evaluate every predicate for `user_id` and award the newly satisfied
/// ones. Returns only the new records; an unchanged second call returns
/// an empty list.
pub fn check_and_award(
    state: &mut State,
    config: &Config,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<Vec<AchievementRecord>> {
    let user = state
        .user(user_id)
        .ok_or_else(|| PotatoError::UserNotFound(user_id.to_string()))?;
    let progress = Progress {
        completed: state
            .archive
            .iter()
            .filter(|a| a.completed_by == user_id)
            .count(),
        level: user.level,
        xp: user.xp,
        streak: user.streak,
    };

    let mut awarded = Vec::new();
    for def in ACHIEVEMENTS {
        if (def.satisfied)(&progress) && !holds(state, user_id, def.id) {
            awarded.push(award(state, config, user_id, def.id, def.name, now)?);
        }
    }
    Ok(awarded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::UserStatus;
    use crate::users::User;

    fn state_with_user() -> State {
        let mut state = State::default();
        state.users.push(User {
            id: "juan".into(),
            name: "Juan".into(),
            status: UserStatus::Active,
            level: 1,
            xp: 0,
            potatoes_completed: 0,
            streak: 0,
        });
        state
    }

    #[test]
    fn check_is_idempotent() {
        let mut state = state_with_user();
        let config = Config::default();
        state.user_mut("juan").unwrap().streak = 7;

        let first = check_and_award(&mut state, &config, "juan", Utc::now()).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].achievement_id, "streak_7");
        assert_eq!(state.user("juan").unwrap().xp, 100);

        let second = check_and_award(&mut state, &config, "juan", Utc::now()).unwrap();
        assert!(second.is_empty());
        assert_eq!(state.user("juan").unwrap().xp, 100);
    }

    #[test]
    fn direct_award_rejects_duplicates() {
        let mut state = state_with_user();
        let config = Config::default();
        award(&mut state, &config, "juan", "level_5", "Level 5 Reached", Utc::now()).unwrap();
        let err = award(&mut state, &config, "juan", "level_5", "Level 5 Reached", Utc::now());
        assert!(matches!(err, Err(PotatoError::DuplicateAchievement { .. })));
        assert_eq!(state.achievements.len(), 1);
    }

    #[test]
    fn xp_award_can_cascade_into_xp_achievement() {
        let mut state = state_with_user();
        let config = Config::default();
        state.user_mut("juan").unwrap().add_xp(950);

        // 950 XP puts the user at level 4; the +100 bonus for crossing a
        // threshold is evaluated on the next check, not recursively.
        let awarded = check_and_award(&mut state, &config, "juan", Utc::now()).unwrap();
        assert!(awarded.is_empty());

        state.user_mut("juan").unwrap().add_xp(50);
        let awarded = check_and_award(&mut state, &config, "juan", Utc::now()).unwrap();
        let ids: Vec<_> = awarded.iter().map(|a| a.achievement_id.as_str()).collect();
        assert!(ids.contains(&"xp_1000"));
        assert!(ids.contains(&"level_5"));
    }

    #[test]
    fn unknown_user_is_rejected() {
        let mut state = State::default();
        let config = Config::default();
        let err = check_and_award(&mut state, &config, "mallory", Utc::now());
        assert!(matches!(err, Err(PotatoError::UserNotFound(_))));
    }
}
