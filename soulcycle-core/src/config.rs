//! Configuration for the progression core.
//!
//! Maps directly to `soulcycle.toml`. Every section and field is optional;
//! missing values take the shipped tuning.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::flags::FlagValue;
use crate::mastery::curve::LevelCurve;

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SoulCycleConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Profile storage settings.
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// Mastery XP tuning.
    #[serde(default)]
    pub mastery: MasteryConfig,
    /// Feature-flag overrides keyed by flag name.
    #[serde(default)]
    pub flags: BTreeMap<String, FlagValue>,
}

impl SoulCycleConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `ProfileError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        toml::from_str(toml_str).map_err(|e| crate::ProfileError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General system settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit logs as JSON lines instead of human-readable text.
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Profile storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// SQLite database holding the key-value slots.
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// Key of the primary profile slot.
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    /// Key of the single backup slot.
    #[serde(default = "default_backup_key")]
    pub backup_key: String,
    /// Use WAL journaling.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            primary_key: default_primary_key(),
            backup_key: default_backup_key(),
            wal_mode: true,
        }
    }
}

/// Mastery XP tuning. Balance values are owned by design, not by this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasteryConfig {
    /// Flat XP granted for any counted run.
    #[serde(default)]
    pub xp_base: f64,
    /// XP per kill.
    #[serde(default = "default_1_0")]
    pub xp_per_kill: f64,
    /// XP per character level reached.
    #[serde(default = "default_6_0")]
    pub xp_per_reached_level: f64,
    /// XP per soul gained during the run.
    #[serde(default)]
    pub xp_per_soul_delta: f64,
    /// Bonus for `fieldComplete`.
    #[serde(default)]
    pub field_complete_bonus: f64,
    /// Bonus for `dungeonComplete`.
    #[serde(default)]
    pub dungeon_complete_bonus: f64,
    /// Bonus for `dungeonFailed`.
    #[serde(default)]
    pub dungeon_failed_bonus: f64,
    /// Whether forfeited or restarted runs still grant XP.
    #[serde(default = "default_true")]
    pub grant_on_forfeit: bool,
    /// History length, clamped to 1..=100.
    #[serde(default = "default_20_usize")]
    pub recent_runs_max: usize,
    /// Curve for attribute tracks.
    #[serde(default = "default_attribute_curve")]
    pub attribute_curve: LevelCurve,
    /// Curve for weapon tracks.
    #[serde(default = "default_weapon_curve")]
    pub weapon_curve: LevelCurve,
}

impl Default for MasteryConfig {
    fn default() -> Self {
        Self {
            xp_base: 0.0,
            xp_per_kill: 1.0,
            xp_per_reached_level: 6.0,
            xp_per_soul_delta: 0.0,
            field_complete_bonus: 0.0,
            dungeon_complete_bonus: 0.0,
            dungeon_failed_bonus: 0.0,
            grant_on_forfeit: true,
            recent_runs_max: 20,
            attribute_curve: LevelCurve::ATTRIBUTE,
            weapon_curve: LevelCurve::WEAPON,
        }
    }
}

impl MasteryConfig {
    /// History length actually applied.
    #[must_use]
    pub fn history_limit(&self) -> usize {
        self.recent_runs_max.clamp(1, 100)
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_db_path() -> String { "soulcycle_profile.db".to_string() }
fn default_primary_key() -> String { "soulcycle:profile".to_string() }
fn default_backup_key() -> String { "soulcycle:profile:backup".to_string() }
fn default_1_0() -> f64 { 1.0 }
fn default_6_0() -> f64 { 6.0 }
fn default_20_usize() -> usize { 20 }
fn default_attribute_curve() -> LevelCurve { LevelCurve::ATTRIBUTE }
fn default_weapon_curve() -> LevelCurve { LevelCurve::WEAPON }
