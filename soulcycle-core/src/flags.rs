//! Feature flags gating progression features.
//!
//! Flags ship incremental milestones reversibly. Each flag has a compiled
//! default; configuration may override it with a boolean-ish value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Gates meta-mastery mutation paths and attribute point spending.
pub const META_MASTERY_ENABLED: &str = "progression.metaMasteryEnabled";
/// Rollout flag for the Repeater weapon id. Informational only: the legacy
/// `pistol` class is always rewritten to `repeater`.
pub const WEAPON_ID_REPEATER_ENABLED: &str = "content.weaponIdRepeaterEnabled";

const DEFAULTS: &[(&str, bool)] = &[
    ("content.useVocabularyValidationStrict", true),
    ("progression.constitutionEnabled", true),
    ("progression.phialsOnlyLevelUps", true),
    ("progression.preRunWeaponPerks", true),
    (META_MASTERY_ENABLED, true),
    (WEAPON_ID_REPEATER_ENABLED, true),
    ("progression.effectSystemShadow", false),
    ("progression.effectSystemEnabled", true),
];

/// Anything that can answer "is this flag on?".
pub trait FlagReader {
    /// Whether `key` is enabled.
    fn is_on(&self, key: &str) -> bool;
}

/// A raw override as written in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    /// `true` / `false`.
    Bool(bool),
    /// `1` / `0`.
    Int(i64),
    /// `"on"`, `"yes"`, `"0"`, ...
    Text(String),
}

impl FlagValue {
    /// Interpret the override, `None` when it is not recognisably boolean.
    #[must_use]
    pub fn coerce(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int(1) => Some(true),
            Self::Int(0) => Some(false),
            Self::Int(_) => None,
            Self::Text(s) => coerce_bool(s),
        }
    }
}

/// Parse `1/true/on/yes` and `0/false/off/no`, case-insensitively.
#[must_use]
pub fn coerce_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

/// Compiled defaults plus configured overrides.
#[derive(Debug, Clone, Default)]
pub struct FeatureFlags {
    overrides: BTreeMap<String, FlagValue>,
}

impl FeatureFlags {
    /// Flags with only the compiled defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flags with configured overrides.
    #[must_use]
    pub fn with_overrides(overrides: BTreeMap<String, FlagValue>) -> Self {
        Self { overrides }
    }

    /// Override one flag at runtime.
    pub fn set(&mut self, key: &str, on: bool) {
        self.overrides.insert(key.to_string(), FlagValue::Bool(on));
    }

    /// The compiled default of `key`, `false` if unknown.
    #[must_use]
    pub fn default_of(key: &str) -> bool {
        DEFAULTS.iter().any(|&(k, on)| k == key && on)
    }
}

impl FlagReader for FeatureFlags {
    fn is_on(&self, key: &str) -> bool {
        self.overrides
            .get(key)
            .and_then(FlagValue::coerce)
            .unwrap_or_else(|| Self::default_of(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_overrides() {
        let flags = FeatureFlags::new();
        assert!(flags.is_on(META_MASTERY_ENABLED));
        assert!(!flags.is_on("progression.effectSystemShadow"));
        assert!(!flags.is_on("no.such.flag"));
    }

    #[test]
    fn overrides_win_when_recognised() {
        let mut overrides = BTreeMap::new();
        overrides.insert(META_MASTERY_ENABLED.to_string(), FlagValue::Text("Off".into()));
        overrides.insert("progression.effectSystemShadow".to_string(), FlagValue::Int(1));
        overrides.insert(WEAPON_ID_REPEATER_ENABLED.to_string(), FlagValue::Text("maybe".into()));
        let flags = FeatureFlags::with_overrides(overrides);
        assert!(!flags.is_on(META_MASTERY_ENABLED));
        assert!(flags.is_on("progression.effectSystemShadow"));
        assert!(flags.is_on(WEAPON_ID_REPEATER_ENABLED));
    }

    #[test]
    fn set_overrides_at_runtime() {
        let mut flags = FeatureFlags::new();
        flags.set(META_MASTERY_ENABLED, false);
        assert!(!flags.is_on(META_MASTERY_ENABLED));
    }
}
