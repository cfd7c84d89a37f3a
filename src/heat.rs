//! Pure temperature and valuation functions.
//!
//! Everything here is a function of its arguments; callers pass `now`
//! explicitly so that reads microseconds apart reflect elapsed time and tests
//! can simulate the clock.

use chrono::{DateTime, Utc};

use crate::fields::Difficulty;

/// Heat gained per second of wall-clock age.
pub const DEGREES_PER_SECOND: f64 = 0.1;

/// Heat added each time the task changes hands.
pub const PASS_PENALTY: f64 = 5.0;

/// Upper bound of the temperature scale.
pub const MAX_TEMPERATURE: f64 = 100.0;

/// Default soft time budget for a new task, in seconds.
pub const DEFAULT_TIME_LIMIT_SECS: i64 = 3600;

/// Current temperature of a task, in [0, 100].
///
/// Age-based heat accrues at [`DEGREES_PER_SECOND`] and is capped at 100
/// before penalties. Each recorded pass adds [`PASS_PENALTY`], plus whatever
/// offset was stored at the most recent pass. A `created_at` in the future
/// (clock skew) contributes no heat rather than negative heat.
pub fn temperature(
    created_at: DateTime<Utc>,
    pass_count: u32,
    stored_offset: f64,
    now: DateTime<Utc>,
) -> f64 {
    let age_secs = (now - created_at).num_milliseconds() as f64 / 1000.0;
    let base = (age_secs * DEGREES_PER_SECOND).clamp(0.0, MAX_TEMPERATURE);
    let t = base + f64::from(pass_count) * PASS_PENALTY + stored_offset;
    t.clamp(0.0, MAX_TEMPERATURE)
}

/// Payout multiplier for a given temperature. Thresholds are strict:
/// exactly 80.0 still pays 1.2, exactly 90.0 still pays 1.5.
pub fn bonus_multiplier(temperature: f64) -> f64 {
    if temperature > 90.0 {
        2.0
    } else if temperature > 80.0 {
        1.5
    } else if temperature > 60.0 {
        1.2
    } else {
        1.0
    }
}

/// Final payout at completion: temperature bonus only, floored.
pub fn earned_value(base_value: i64, temperature: f64) -> i64 {
    (base_value as f64 * bonus_multiplier(temperature)).floor() as i64
}

/// Game score derived from a payout.
pub fn game_score(earned: i64) -> i64 {
    earned / 10
}

/// Potential (not-yet-earned) value of an active task. Unlike completion,
/// the preview also multiplies by the difficulty tier.
pub fn potential_value(base_value: i64, temperature: f64, difficulty: Difficulty) -> i64 {
    let raw = base_value as f64 * bonus_multiplier(temperature) * difficulty.multiplier() as f64;
    raw.round() as i64
}

/// Remaining time budget in seconds, clamped at zero.
pub fn time_left(created_at: DateTime<Utc>, time_limit_secs: i64, now: DateTime<Utc>) -> i64 {
    let elapsed = (now - created_at).num_seconds();
    (time_limit_secs - elapsed).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn temperature_grows_with_age() {
        let created = t0();
        // 0.1 deg/s: 100 seconds -> 10 degrees.
        let t = temperature(created, 0, 0.0, created + Duration::seconds(100));
        assert!((t - 10.0).abs() < 1e-9);
    }

    #[test]
    fn temperature_is_monotonic_until_saturation() {
        let created = t0();
        let mut prev = 0.0;
        for secs in (0..2000).step_by(50) {
            let t = temperature(created, 0, 0.0, created + Duration::seconds(secs));
            assert!(t >= prev);
            prev = t;
        }
        assert!((prev - 100.0).abs() < 1e-9);
    }

    #[test]
    fn temperature_clamps_to_range() {
        let created = t0();
        // Future creation time must not go negative.
        let skewed = temperature(created, 0, 0.0, created - Duration::seconds(500));
        assert_eq!(skewed, 0.0);
        // Huge pass count saturates at 100.
        let hot = temperature(created, 10_000, 0.0, created + Duration::seconds(1));
        assert_eq!(hot, 100.0);
        // Stored offset cannot push past 100 either.
        let offset = temperature(created, 0, 500.0, created);
        assert_eq!(offset, 100.0);
    }

    #[test]
    fn pass_penalty_raises_temperature() {
        let created = t0();
        let now = created + Duration::seconds(300);
        let before = temperature(created, 2, 0.0, now);
        let after = temperature(created, 3, 0.0, now);
        assert!((after - before - PASS_PENALTY).abs() < 1e-9);
    }

    #[test]
    fn bonus_tiers_use_strict_thresholds() {
        assert_eq!(bonus_multiplier(60.0), 1.0);
        assert_eq!(bonus_multiplier(60.0001), 1.2);
        assert_eq!(bonus_multiplier(80.0), 1.2);
        assert_eq!(bonus_multiplier(80.0001), 1.5);
        assert_eq!(bonus_multiplier(90.0), 1.5);
        assert_eq!(bonus_multiplier(90.0001), 2.0);
        assert_eq!(bonus_multiplier(100.0), 2.0);
    }

    #[test]
    fn earned_value_floors() {
        // 333 * 1.2 = 399.6 -> 399
        assert_eq!(earned_value(333, 61.0), 399);
        assert_eq!(earned_value(1000, 95.0), 2000);
        assert_eq!(game_score(2000), 200);
        assert_eq!(game_score(9), 0);
    }

    #[test]
    fn potential_value_includes_difficulty() {
        // Completion formula would give 1500; the preview triples it for epic.
        assert_eq!(potential_value(1000, 85.0, Difficulty::Epic), 4500);
        assert_eq!(potential_value(1000, 85.0, Difficulty::Common), 1500);
        assert_eq!(potential_value(1000, 50.0, Difficulty::Rare), 2000);
    }

    #[test]
    fn time_left_clamps_at_zero() {
        let created = t0();
        assert_eq!(time_left(created, 3600, created + Duration::seconds(600)), 3000);
        assert_eq!(time_left(created, 3600, created + Duration::seconds(7200)), 0);
    }
}
