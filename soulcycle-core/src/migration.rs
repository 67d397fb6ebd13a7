//! Forward-only profile schema migrations.
//!
//! A stored profile names its schema in `schemaVersion` (absent or
//! non-numeric reads as 0). [`migrate`] runs every step from that version up
//! to [`CURRENT_SCHEMA_VERSION`], each step taking a profile at version `N`,
//! whatever its actual shape, and returning one that is guaranteed to be
//! shaped like version `N + 1`.
//!
//! | step | change                                                              |
//! |------|---------------------------------------------------------------------|
//! | 0→1  | full default shape, legacy substructures shallow-merged on top      |
//! | 1→2  | legacy `pistol` weapon class rewritten to `repeater` everywhere     |
//! | 2→3  | `armory.attunement` and the four `mastery.attributeTrees` introduced |
//! | 3→4  | exclusive-group repair on every attribute tree                      |
//! | 4→5  | wallet clamped non-negative, tree spent-points re-sanitized         |
//!
//! Versions newer than this build are returned untouched: an older client
//! must not "repair" data it does not understand.
//!
//! Steps own their input, so a caller's copy of the raw blob is never
//! modified.

use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::content::{Content, LEGACY_REPEATER_CLS, REPEATER_CLS};
use crate::profile::{AttributeTree, CURRENT_SCHEMA_VERSION, now_iso};
use crate::sanitize;
use crate::tree::normalize_exclusive_groups;
use crate::types::{AttributeId, WeaponId};

/// One version boundary.
struct Migration {
    from: u64,
    description: &'static str,
    apply: fn(Value, &Content) -> Value,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        from: 0,
        description: "adopt default shape",
        apply: adopt_default_shape,
    },
    Migration {
        from: 1,
        description: "canonical repeater weapon class",
        apply: canonical_repeater_cls,
    },
    Migration {
        from: 2,
        description: "introduce attunement and attribute trees",
        apply: introduce_attribute_trees,
    },
    Migration {
        from: 3,
        description: "repair exclusive groups",
        apply: repair_exclusive_groups,
    },
    Migration {
        from: 4,
        description: "clamp wallet and spent points",
        apply: clamp_wallet_and_spent_points,
    },
];

/// The schema version a raw profile claims. Absent, non-numeric or negative
/// values read as 0; fractions are floored.
#[must_use]
pub fn schema_version(raw: &Value) -> u64 {
    raw.get("schemaVersion")
        .and_then(sanitize::coerce_number)
        .map_or(0, |n| sanitize::clamp_u64(n, u64::MAX))
}

/// Migrate a raw profile to the current schema.
///
/// Never fails. Input at the current version, or at a future version, is
/// returned unchanged.
#[must_use]
pub fn migrate(raw: Value, content: &Content) -> Value {
    let start = schema_version(&raw);
    if start > CURRENT_SCHEMA_VERSION {
        warn!(
            version = start,
            current = CURRENT_SCHEMA_VERSION,
            "Profile is from a newer schema; leaving it untouched"
        );
        return raw;
    }

    MIGRATIONS
        .iter()
        .filter(|m| m.from >= start)
        .fold(raw, |value, m| {
            debug!(
                from = m.from,
                to = m.from + 1,
                step = m.description,
                "Applying profile migration"
            );
            (m.apply)(value, content)
        })
}

// ---------------------------------------------------------------------------
// Shape helpers
// ---------------------------------------------------------------------------

fn into_object(v: Value) -> Map<String, Value> {
    match v {
        Value::Object(m) => m,
        _ => Map::new(),
    }
}

/// Detach `key` as an object, substituting an empty one for anything else.
fn take_object(parent: &mut Map<String, Value>, key: &str) -> Map<String, Value> {
    parent.remove(key).map(into_object).unwrap_or_default()
}

fn put(parent: &mut Map<String, Value>, key: &str, value: Map<String, Value>) {
    parent.insert(key.to_string(), Value::Object(value));
}

fn stamp(mut root: Map<String, Value>, version: u64) -> Value {
    root.insert("schemaVersion".to_string(), Value::from(version));
    root.insert("updatedAt".to_string(), Value::from(now_iso()));
    Value::Object(root)
}

fn track() -> Value {
    json!({"xp": 0, "level": 0, "unlocks": []})
}

/// Default profile as first persisted (schema 1).
fn v1_default_shape() -> Map<String, Value> {
    let now = now_iso();
    let attributes: Map<String, Value> = AttributeId::ALL
        .iter()
        .map(|a| (a.as_str().to_string(), track()))
        .collect();
    let weapons: Map<String, Value> = WeaponId::ALL
        .iter()
        .map(|w| (w.as_str().to_string(), track()))
        .collect();
    into_object(json!({
        "schemaVersion": 1,
        "createdAt": now,
        "updatedAt": now,
        "settings": {"cameraZoom": null},
        "armory": {
            "loadout": {"weaponCls": null, "gearBySlot": {}},
            "perkSocketsByWeapon": {}
        },
        "wallet": {"souls": 0},
        "mastery": {"attributes": attributes, "weapons": weapons},
        "history": {"recentRuns": []}
    }))
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// Substructures whose legacy keys are carried over by the first step.
const LEGACY_MERGED: [&str; 5] = ["settings", "armory", "wallet", "mastery", "history"];

fn adopt_default_shape(raw: Value, _content: &Content) -> Value {
    let legacy = into_object(raw);
    let mut next = v1_default_shape();
    for (key, sub) in legacy {
        if !LEGACY_MERGED.contains(&key.as_str()) {
            continue;
        }
        if let Value::Object(sub) = sub {
            let mut merged = take_object(&mut next, &key);
            merged.extend(sub);
            put(&mut next, &key, merged);
        }
    }
    stamp(next, 1)
}

/// Rewrite the legacy alias in place. Returns whether it was rewritten.
fn rewrite_legacy_cls(cls: &mut Value) -> bool {
    let is_legacy = cls
        .as_str()
        .is_some_and(|s| s.trim().eq_ignore_ascii_case(LEGACY_REPEATER_CLS));
    if is_legacy {
        *cls = Value::from(REPEATER_CLS);
    }
    is_legacy
}

fn canonical_repeater_cls(raw: Value, _content: &Content) -> Value {
    let mut root = into_object(raw);

    let mut armory = take_object(&mut root, "armory");
    let mut loadout = take_object(&mut armory, "loadout");
    let cls = loadout.entry("weaponCls").or_insert(Value::Null);
    rewrite_legacy_cls(cls);
    let mut gear = take_object(&mut loadout, "gearBySlot");
    if let Some(Value::Object(weapon)) = gear.get_mut("weapon") {
        if let Some(cls) = weapon.get_mut("cls") {
            rewrite_legacy_cls(cls);
        }
    }
    put(&mut loadout, "gearBySlot", gear);
    put(&mut armory, "loadout", loadout);
    put(&mut root, "armory", armory);

    let mut history = take_object(&mut root, "history");
    let mut runs = match history.remove("recentRuns") {
        Some(Value::Array(runs)) => runs,
        _ => Vec::new(),
    };
    for entry in &mut runs {
        let Value::Object(entry) = entry else {
            continue;
        };
        let rewritten = entry.get_mut("weaponCls").is_some_and(rewrite_legacy_cls);
        if rewritten && entry.get("weaponId").is_none_or(Value::is_null) {
            entry.insert("weaponId".to_string(), Value::from(WeaponId::Repeater.as_str()));
        }
    }
    history.insert("recentRuns".to_string(), Value::Array(runs));
    put(&mut root, "history", history);

    stamp(root, 2)
}

fn tree_value(tree: &AttributeTree) -> Value {
    serde_json::to_value(tree).unwrap_or_default()
}

fn introduce_attribute_trees(raw: Value, content: &Content) -> Value {
    let mut root = into_object(raw);

    let mut armory = take_object(&mut root, "armory");
    let attunement = armory
        .get("attunement")
        .and_then(sanitize::non_empty_string)
        .and_then(|s| s.parse::<AttributeId>().ok())
        .or_else(|| {
            let loadout = armory.get("loadout")?;
            sanitize::non_empty_string(&loadout["weaponCls"])
                .or_else(|| sanitize::non_empty_string(&loadout["gearBySlot"]["weapon"]["cls"]))
                .and_then(|cls| content.weapon_config(&cls))
                .map(|w| w.primary_attribute)
        });
    armory.insert(
        "attunement".to_string(),
        attunement.map_or(Value::Null, |a| Value::from(a.as_str())),
    );
    put(&mut root, "armory", armory);

    let mut mastery = take_object(&mut root, "mastery");
    let mut legacy_trees = take_object(&mut mastery, "attributeTrees");
    let trees: Map<String, Value> = AttributeId::ALL
        .iter()
        .map(|attr| {
            let t = legacy_trees.remove(attr.as_str()).unwrap_or_default();
            let sanitized = AttributeTree {
                unlocked: sanitize::sanitize_string_list(&t["unlocked"]),
                selected_exclusive: sanitize::sanitize_string_map(&t["selectedExclusive"]),
                spent_by_node_id: sanitize::sanitize_non_negative_number_map(&t["spentByNodeId"]),
                ..AttributeTree::default()
            };
            (attr.as_str().to_string(), tree_value(&sanitized))
        })
        .collect();
    put(&mut mastery, "attributeTrees", trees);
    put(&mut root, "mastery", mastery);

    stamp(root, 3)
}

fn repair_exclusive_groups(raw: Value, content: &Content) -> Value {
    let mut root = into_object(raw);
    let mut mastery = take_object(&mut root, "mastery");
    let mut trees = take_object(&mut mastery, "attributeTrees");
    for attr in AttributeId::ALL {
        let tree = trees.remove(attr.as_str()).unwrap_or_default();
        let repaired = normalize_exclusive_groups(attr, &tree, content);
        trees.insert(attr.as_str().to_string(), tree_value(&repaired));
    }
    put(&mut mastery, "attributeTrees", trees);
    put(&mut root, "mastery", mastery);
    stamp(root, 4)
}

fn clamp_wallet_and_spent_points(raw: Value, _content: &Content) -> Value {
    let mut root = into_object(raw);

    let mut wallet = take_object(&mut root, "wallet");
    let souls = wallet
        .get("souls")
        .and_then(sanitize::coerce_number)
        .unwrap_or(0.0)
        .max(0.0);
    wallet.insert("souls".to_string(), Value::from(souls));
    put(&mut root, "wallet", wallet);

    let mut mastery = take_object(&mut root, "mastery");
    let mut trees = take_object(&mut mastery, "attributeTrees");
    for attr in AttributeId::ALL {
        let mut tree = take_object(&mut trees, attr.as_str());
        let spent = tree.remove("spentByNodeId").unwrap_or_default();
        let spent: Map<String, Value> = sanitize::sanitize_non_negative_number_map(&spent)
            .into_iter()
            .map(|(k, v)| (k, Value::from(v)))
            .collect();
        put(&mut tree, "spentByNodeId", spent);
        put(&mut trees, attr.as_str(), tree);
    }
    put(&mut mastery, "attributeTrees", trees);
    put(&mut root, "mastery", mastery);

    stamp(root, 5)
}
