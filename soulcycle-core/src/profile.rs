//! The typed, current-schema player profile.
//!
//! The JSON form uses camelCase keys. Every field decodes leniently (see
//! [`crate::sanitize::lenient`]) so a value that survived migration but still
//! holds a malformed leaf loses only that leaf. Unknown keys, at the root or
//! inside any nested record, are carried through load and save untouched, so
//! a save written by a newer build keeps the fields this build cannot read.

use std::collections::BTreeMap;

use chrono::{SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::content::Content;
use crate::mastery::run::RunResult;
use crate::sanitize::lenient;
use crate::types::{AttributeId, WeaponId};

/// Schema version written by this build.
pub const CURRENT_SCHEMA_VERSION: u64 = 5;

/// Current wall-clock time in the format stored on profiles.
#[must_use]
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Root persisted player-progression record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Schema version of this record.
    #[serde(default, deserialize_with = "lenient::counter")]
    pub schema_version: u64,
    /// Creation time (RFC 3339).
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub created_at: String,
    /// Last save or migration time (RFC 3339).
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub updated_at: String,
    /// Player settings.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub settings: Settings,
    /// Loadout and pre-run choices.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub armory: Armory,
    /// Currency.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub wallet: Wallet,
    /// Mastery tracks and attribute trees.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub mastery: Mastery,
    /// Recent run summaries.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub history: History,
    /// Keys this build does not know about.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Profile {
    /// A fresh profile: current version, zeroed tracks, empty trees.
    #[must_use]
    pub fn new() -> Self {
        let now = now_iso();
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            created_at: now.clone(),
            updated_at: now,
            settings: Settings::default(),
            armory: Armory::default(),
            wallet: Wallet::default(),
            mastery: Mastery::default(),
            history: History::default(),
            extra: Map::new(),
        }
    }

    /// Decode a migrated JSON value. Only non-objects are rejected.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value).ok()
    }

    /// Mastery track of an attribute, created on demand.
    pub fn attribute_track_mut(&mut self, attribute: AttributeId) -> &mut MasteryTrack {
        self.mastery.attributes.entry(attribute).or_default()
    }

    /// Mastery track of a weapon, created on demand.
    pub fn weapon_track_mut(&mut self, weapon: WeaponId) -> &mut MasteryTrack {
        self.mastery.weapons.entry(weapon).or_default()
    }

    /// Repair every attribute tree against the exclusive groups in `content`.
    pub fn normalize_trees(&mut self, content: &Content) {
        for attribute in AttributeId::ALL {
            self.mastery
                .attribute_trees
                .entry(attribute)
                .or_default()
                .normalize(attribute, content);
        }
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::new()
    }
}

/// Player settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Preferred camera zoom, `None` for the game default.
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub camera_zoom: Option<f64>,
    /// Settings owned by other systems.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Loadout and pre-run selections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Armory {
    /// Currently equipped gear.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub loadout: Loadout,
    /// Global attribute attunement.
    #[serde(default, deserialize_with = "lenient::optional_attribute")]
    pub attunement: Option<AttributeId>,
    /// Weapon id to (socket level to perk id).
    #[serde(default, deserialize_with = "lenient::nested_string_map")]
    pub perk_sockets_by_weapon: BTreeMap<String, BTreeMap<String, String>>,
    /// Keys this build does not know about.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Equipped gear.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Loadout {
    /// Weapon class of the equipped weapon.
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub weapon_cls: Option<String>,
    /// Gear snapshots keyed by slot. Shapes are owned by the game.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub gear_by_slot: Map<String, Value>,
    /// Keys this build does not know about.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Currency balance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    /// Souls, never negative.
    #[serde(default, deserialize_with = "lenient::non_negative")]
    pub souls: f64,
    /// Keys this build does not know about.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// XP and level counter for one attribute or one weapon.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasteryTrack {
    /// Banked XP toward the next level.
    #[serde(default, deserialize_with = "lenient::counter")]
    pub xp: u64,
    /// Current level.
    #[serde(default, deserialize_with = "lenient::counter")]
    pub level: u64,
    /// Unlock ids earned on this track.
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub unlocks: Vec<String>,
    /// Keys this build does not know about.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Unlockable nodes of one attribute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeTree {
    /// Unlocked node ids in unlock order.
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub unlocked: Vec<String>,
    /// Exclusive group id to the chosen node id.
    #[serde(default, deserialize_with = "lenient::string_map")]
    pub selected_exclusive: BTreeMap<String, String>,
    /// Points spent per node.
    #[serde(default, deserialize_with = "lenient::number_map")]
    pub spent_by_node_id: BTreeMap<String, f64>,
    /// Keys this build does not know about.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// All mastery state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mastery {
    /// One track per attribute.
    #[serde(default = "all_keys", deserialize_with = "attribute_map")]
    pub attributes: BTreeMap<AttributeId, MasteryTrack>,
    /// One track per weapon.
    #[serde(default = "all_keys", deserialize_with = "weapon_map")]
    pub weapons: BTreeMap<WeaponId, MasteryTrack>,
    /// One tree per attribute.
    #[serde(default = "all_keys", deserialize_with = "attribute_map")]
    pub attribute_trees: BTreeMap<AttributeId, AttributeTree>,
    /// Keys this build does not know about.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Mastery {
    fn default() -> Self {
        Self {
            attributes: all_keys(),
            weapons: all_keys(),
            attribute_trees: all_keys(),
            extra: Map::new(),
        }
    }
}

/// Run summaries, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct History {
    /// Bounded list of recent runs.
    #[serde(default, deserialize_with = "lenient::filtered_vec")]
    pub recent_runs: Vec<RunHistoryEntry>,
    /// Keys this build does not know about.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A run result plus the mastery XP it granted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunHistoryEntry {
    /// The run as reported.
    #[serde(flatten)]
    pub run: RunResult,
    /// XP granted for the run.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub mastery_xp: Option<u64>,
    /// Keys this build does not know about.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// Enum-keyed maps
// ---------------------------------------------------------------------------

/// Ids that key a fixed set of per-id entries.
trait FixedKey: Copy + Ord + 'static {
    const KEYS: &'static [Self];
    fn key(self) -> &'static str;
}

impl FixedKey for AttributeId {
    const KEYS: &'static [Self] = &Self::ALL;
    fn key(self) -> &'static str {
        self.as_str()
    }
}

impl FixedKey for WeaponId {
    const KEYS: &'static [Self] = &Self::ALL;
    fn key(self) -> &'static str {
        self.as_str()
    }
}

fn all_keys<K: FixedKey, T: Default>() -> BTreeMap<K, T> {
    K::KEYS.iter().map(|&k| (k, T::default())).collect()
}

/// Every known key is present; unknown keys are dropped; each entry decodes
/// leniently and falls back to its default.
fn fixed_key_map<'de, D, K, T>(d: D) -> Result<BTreeMap<K, T>, D::Error>
where
    D: Deserializer<'de>,
    K: FixedKey,
    T: DeserializeOwned + Default,
{
    let v = Value::deserialize(d)?;
    let obj = v.as_object();
    Ok(K::KEYS
        .iter()
        .map(|&k| {
            let entry = obj
                .and_then(|o| o.get(k.key()))
                .and_then(|e| serde_json::from_value(e.clone()).ok())
                .unwrap_or_default();
            (k, entry)
        })
        .collect())
}

fn attribute_map<'de, D, T>(d: D) -> Result<BTreeMap<AttributeId, T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    fixed_key_map(d)
}

fn weapon_map<'de, D, T>(d: D) -> Result<BTreeMap<WeaponId, T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    fixed_key_map(d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fresh_profile_is_zeroed() {
        let p = Profile::new();
        assert_eq!(p.schema_version, 5);
        assert!(p.wallet.souls.abs() < f64::EPSILON);
        assert_eq!(p.armory.attunement, None);
        assert_eq!(p.mastery.attributes.len(), 4);
        assert_eq!(p.mastery.weapons.len(), 4);
        assert_eq!(p.mastery.attribute_trees.len(), 4);
        for track in p.mastery.attributes.values().chain(p.mastery.weapons.values()) {
            assert_eq!((track.xp, track.level), (0, 0));
        }
        assert!(p.history.recent_runs.is_empty());
    }

    #[test]
    fn json_uses_save_format_keys() {
        let v = serde_json::to_value(Profile::new()).expect("serialize");
        assert_eq!(v["schemaVersion"], 5);
        assert_eq!(v["mastery"]["weapons"]["Repeater"]["level"], 0);
        assert!(v["mastery"]["attributeTrees"]["Will"]["selectedExclusive"].is_object());
        assert!(v["armory"]["attunement"].is_null());
        assert!(v["history"]["recentRuns"].is_array());
    }

    #[test]
    fn malformed_leaves_degrade_individually() {
        let v = json!({
            "schemaVersion": 5,
            "wallet": {"souls": "lots"},
            "armory": {"attunement": "Luck", "loadout": {"weaponCls": "hammer"}},
            "mastery": {
                "attributes": {"Might": {"xp": 12, "level": "x"}, "Luck": {"xp": 1}},
                "weapons": "broken"
            },
            "history": {"recentRuns": [7, {"kills": 3, "masteryXp": 9}]}
        });
        let p = Profile::from_value(v).expect("object decodes");
        assert!(p.wallet.souls.abs() < f64::EPSILON);
        assert_eq!(p.armory.attunement, None);
        assert_eq!(p.armory.loadout.weapon_cls.as_deref(), Some("hammer"));
        assert_eq!(p.mastery.attributes[&AttributeId::Might].xp, 12);
        assert_eq!(p.mastery.attributes[&AttributeId::Might].level, 0);
        assert_eq!(p.mastery.attributes.len(), 4);
        assert_eq!(p.mastery.weapons.len(), 4);
        assert_eq!(p.history.recent_runs.len(), 1);
        assert_eq!(p.history.recent_runs[0].run.kills, 3);
        assert_eq!(p.history.recent_runs[0].mastery_xp, Some(9));
    }

    #[test]
    fn unknown_keys_survive_round_trip() {
        let v = json!({
            "schemaVersion": 5,
            "cosmetics": {"hat": "tricorn"},
            "settings": {"cameraZoom": 1.5, "musicVolume": 0.4}
        });
        let p = Profile::from_value(v).expect("decode");
        let back = serde_json::to_value(&p).expect("encode");
        assert_eq!(back["cosmetics"]["hat"], "tricorn");
        assert_eq!(back["settings"]["musicVolume"], 0.4);
        assert_eq!(back["settings"]["cameraZoom"], 1.5);
    }

    #[test]
    fn non_objects_are_rejected() {
        assert!(Profile::from_value(json!([1, 2])).is_none());
        assert!(Profile::from_value(json!("profile")).is_none());
    }
}
