//! Enumerations and field types for the potato tracker.
//!
//! This module defines the closed domain sets used to categorise tasks and
//! users: categories, difficulty tiers, heat tiers, user status and the
//! leaderboard sort keys.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Business category a task belongs to. Closed set; `CustomerSatisfaction`
/// survives only so legacy archive entries still deserialize.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    #[serde(rename = "Sales")]
    Sales,
    #[serde(rename = "New Lead")]
    NewLead,
    #[serde(rename = "New Customer")]
    NewCustomer,
    #[serde(rename = "Pre-Construction")]
    PreConstruction,
    #[serde(rename = "Construction")]
    Construction,
    #[serde(rename = "Post Construction")]
    PostConstruction,
    #[serde(rename = "Customer Satisfaction")]
    CustomerSatisfaction,
}

/// Task difficulty; drives the default base value and the potential-earnings
/// multiplier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Common,
    Rare,
    Epic,
}

impl Difficulty {
    /// Multiplier applied in potential-earnings previews (never at completion).
    pub fn multiplier(self) -> i64 {
        match self {
            Difficulty::Common => 1,
            Difficulty::Rare => 2,
            Difficulty::Epic => 3,
        }
    }

    /// Default base value when none is supplied at intake.
    pub fn default_value(self) -> i64 {
        match self {
            Difficulty::Common => 1000,
            Difficulty::Rare => 2500,
            Difficulty::Epic => 5000,
        }
    }
}

/// Temperature bucket. Thresholds are exact and shared by every consumer:
/// `Critical` at 95 and above, `Review` above 80, `InProgress` otherwise.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum HeatTier {
    InProgress,
    Review,
    Critical,
}

impl HeatTier {
    pub fn for_temperature(t: f64) -> Self {
        if t >= 95.0 {
            HeatTier::Critical
        } else if t > 80.0 {
            HeatTier::Review
        } else {
            HeatTier::InProgress
        }
    }
}

/// Availability of a roster member.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Break,
    Offline,
}

/// Sort keys accepted by the leaderboard.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum LeaderboardKey {
    Xp,
    Level,
    Completed,
    Streak,
    Earnings,
}

/// Format a category for display and CSV output.
pub fn format_category(c: Category) -> &'static str {
    match c {
        Category::Sales => "Sales",
        Category::NewLead => "New Lead",
        Category::NewCustomer => "New Customer",
        Category::PreConstruction => "Pre-Construction",
        Category::Construction => "Construction",
        Category::PostConstruction => "Post Construction",
        Category::CustomerSatisfaction => "Customer Satisfaction",
    }
}

/// Format a difficulty for display and CSV output.
pub fn format_difficulty(d: Difficulty) -> &'static str {
    match d {
        Difficulty::Common => "common",
        Difficulty::Rare => "rare",
        Difficulty::Epic => "epic",
    }
}

/// Format a heat tier for display.
pub fn format_tier(t: HeatTier) -> &'static str {
    match t {
        HeatTier::InProgress => "In Progress",
        HeatTier::Review => "Review",
        HeatTier::Critical => "Critical",
    }
}

/// Format a user status for display.
pub fn format_status(s: UserStatus) -> &'static str {
    match s {
        UserStatus::Active => "active",
        UserStatus::Break => "break",
        UserStatus::Offline => "offline",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heat_tier_boundaries_are_exact() {
        assert_eq!(HeatTier::for_temperature(80.0), HeatTier::InProgress);
        assert_eq!(HeatTier::for_temperature(80.001), HeatTier::Review);
        assert_eq!(HeatTier::for_temperature(94.999), HeatTier::Review);
        assert_eq!(HeatTier::for_temperature(95.0), HeatTier::Critical);
        assert_eq!(HeatTier::for_temperature(100.0), HeatTier::Critical);
        assert_eq!(HeatTier::for_temperature(0.0), HeatTier::InProgress);
    }

    #[test]
    fn difficulty_defaults_sit_inside_value_bounds() {
        for d in [Difficulty::Common, Difficulty::Rare, Difficulty::Epic] {
            let v = d.default_value();
            assert!((100..=50000).contains(&v));
        }
    }

    #[test]
    fn category_serde_uses_display_names() {
        let json = serde_json::to_string(&Category::NewLead).unwrap();
        assert_eq!(json, "\"New Lead\"");
        let back: Category = serde_json::from_str("\"Pre-Construction\"").unwrap();
        assert_eq!(back, Category::PreConstruction);
    }
}
