//! Roster and tunables, loaded from `config.json` in the data directory.
//!
//! The user roster is a closed, externally-configured enumeration, not a
//! hardcoded domain constant. A missing config file yields the seeded default
//! roster and writes it out so operators have something to edit.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PotatoError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub roster: Vec<RosterEntry>,
    /// Trailing window for trend reports, in days.
    #[serde(default = "default_trend_window")]
    pub trend_window_days: i64,
    /// Flat XP grant per newly awarded achievement.
    #[serde(default = "default_achievement_xp")]
    pub achievement_xp: i64,
}

fn default_trend_window() -> i64 {
    30
}

fn default_achievement_xp() -> i64 {
    100
}

impl Default for Config {
    fn default() -> Self {
        let seed = [
            ("ilan", "Ilan"),
            ("nas", "Nas"),
            ("juan", "Juan"),
            ("jessie", "Jessie"),
            ("brandon", "Brandon"),
        ];
        Config {
            roster: seed
                .iter()
                .map(|(id, name)| RosterEntry {
                    id: (*id).to_string(),
                    name: (*name).to_string(),
                })
                .collect(),
            trend_window_days: default_trend_window(),
            achievement_xp: default_achievement_xp(),
        }
    }
}

impl Config {
    pub fn path(data_dir: &Path) -> PathBuf {
        data_dir.join("config.json")
    }

    /// Load the config, seeding the default roster on first run.
    pub fn load_or_init(data_dir: &Path) -> Result<Self> {
        let path = Self::path(data_dir);
        if !path.exists() {
            let config = Config::default();
            config.save(data_dir)?;
            return Ok(config);
        }
        let buf = fs::read_to_string(&path).map_err(|source| PotatoError::StorageUnavailable {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&buf).map_err(|source| PotatoError::CorruptData {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let path = Self::path(data_dir);
        let data = serde_json::to_string_pretty(self).map_err(|source| {
            PotatoError::CorruptData {
                path: path.display().to_string(),
                source,
            }
        })?;
        fs::write(&path, data).map_err(|source| PotatoError::StorageUnavailable {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn is_roster_member(&self, user_id: &str) -> bool {
        self.roster.iter().any(|u| u.id == user_id)
    }
}
