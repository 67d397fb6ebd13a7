//! Read-only content tables consumed by the core.
//!
//! The game owns its content; this module only models the slice the core
//! needs: the weapon-class table, attribute-tree node definitions (ids and
//! exclusive groups) and phial attribute tags. Tables can be loaded from a
//! TOML file:
//!
//! ```toml
//! [weapons.hammer]
//! weapon_id = "Hammer"
//! primary_attribute = "Might"
//!
//! [[tree_nodes]]
//! attribute = "Might"
//! id = "might_t2_brute"
//! exclusive_group = "might_t2"
//!
//! [[phials]]
//! id = "ashenHalo"
//! attribute_tag = "Might"
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ProfileError, Result};
use crate::types::{AttributeId, WeaponId};

/// Legacy weapon-class alias that older saves still carry.
pub const LEGACY_REPEATER_CLS: &str = "pistol";
/// Canonical class name the legacy alias is rewritten to.
pub const REPEATER_CLS: &str = "repeater";

/// What a weapon class resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponConfig {
    /// Canonical weapon identity.
    pub weapon_id: WeaponId,
    /// Attribute that receives the weapon share of mastery XP.
    pub primary_attribute: AttributeId,
}

/// One node of an attribute mastery tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNodeDef {
    /// Tree the node belongs to.
    pub attribute: AttributeId,
    /// Unique node id.
    pub id: String,
    /// Members of the same group are mutually exclusive.
    #[serde(default)]
    pub exclusive_group: Option<String>,
}

/// A phial, as far as mastery weighting is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhialDef {
    /// Phial id as used in the player's stack map.
    pub id: String,
    /// Attribute this phial weights toward, if tagged.
    #[serde(default)]
    pub attribute_tag: Option<AttributeId>,
}

/// All static content tables the core reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    /// Weapon class (lowercase) to weapon config.
    #[serde(default)]
    pub weapons: BTreeMap<String, WeaponConfig>,
    /// Attribute-tree nodes, in authoring order.
    #[serde(default)]
    pub tree_nodes: Vec<TreeNodeDef>,
    /// Phial definitions.
    #[serde(default)]
    pub phials: Vec<PhialDef>,
}

impl Content {
    /// The content shipped with the game: the weapon table and the phial
    /// roster. Tree nodes are authored separately and start empty.
    #[must_use]
    pub fn builtin() -> Self {
        let weapon = |weapon_id, primary_attribute| WeaponConfig {
            weapon_id,
            primary_attribute,
        };
        let weapons = BTreeMap::from([
            ("hammer".to_string(), weapon(WeaponId::Hammer, AttributeId::Might)),
            ("staff".to_string(), weapon(WeaponId::Staff, AttributeId::Will)),
            (REPEATER_CLS.to_string(), weapon(WeaponId::Repeater, AttributeId::Alacrity)),
            (
                LEGACY_REPEATER_CLS.to_string(),
                weapon(WeaponId::Repeater, AttributeId::Alacrity),
            ),
            ("scythe".to_string(), weapon(WeaponId::Scythe, AttributeId::Constitution)),
        ]);
        let phials = ["ashenHalo", "soulSalvo", "witchglassAegis", "blindingStep", "titheEngine"]
            .into_iter()
            .map(|id| PhialDef {
                id: id.to_string(),
                attribute_tag: None,
            })
            .collect();
        Self {
            weapons,
            tree_nodes: Vec::new(),
            phials,
        }
    }

    /// Load content tables from a TOML string.
    ///
    /// # Errors
    /// Returns `ProfileError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| ProfileError::Config(e.to_string()))
    }

    /// Load content tables from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Resolve a weapon class, accepting legacy aliases and any casing.
    #[must_use]
    pub fn weapon_config(&self, cls: &str) -> Option<WeaponConfig> {
        self.weapons.get(&normalize_weapon_cls(cls)).copied()
    }

    /// Nodes of one attribute tree, in authoring order.
    pub fn tree_nodes(&self, attribute: AttributeId) -> impl Iterator<Item = &TreeNodeDef> {
        self.tree_nodes.iter().filter(move |n| n.attribute == attribute)
    }

    /// Attribute tag of a phial, `None` when untagged or unknown.
    #[must_use]
    pub fn phial_attribute_tag(&self, phial_id: &str) -> Option<AttributeId> {
        self.phials
            .iter()
            .find(|p| p.id == phial_id)
            .and_then(|p| p.attribute_tag)
    }
}

/// Lowercase a weapon class and rewrite the legacy alias.
#[must_use]
pub fn normalize_weapon_cls(cls: &str) -> String {
    let c = cls.trim().to_lowercase();
    if c == LEGACY_REPEATER_CLS {
        REPEATER_CLS.to_string()
    } else {
        c
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_alias_resolves_to_repeater() {
        let content = Content::builtin();
        let cfg = content.weapon_config("Pistol").expect("known class");
        assert_eq!(cfg.weapon_id, WeaponId::Repeater);
        assert_eq!(cfg.primary_attribute, AttributeId::Alacrity);
        assert_eq!(normalize_weapon_cls("PISTOL"), "repeater");
        assert_eq!(normalize_weapon_cls("Hammer"), "hammer");
    }

    #[test]
    fn unknown_class_resolves_to_none() {
        assert!(Content::builtin().weapon_config("crossbow").is_none());
    }

    #[test]
    fn loads_from_toml() {
        let content = Content::from_toml(
            r#"
            [weapons.hammer]
            weapon_id = "Hammer"
            primary_attribute = "Might"

            [[tree_nodes]]
            attribute = "Might"
            id = "m_a"
            exclusive_group = "g1"

            [[tree_nodes]]
            attribute = "Will"
            id = "w_a"

            [[phials]]
            id = "ashenHalo"
            attribute_tag = "Might"
            "#,
        )
        .expect("valid toml");

        assert_eq!(content.tree_nodes(AttributeId::Might).count(), 1);
        assert_eq!(content.tree_nodes(AttributeId::Will).count(), 1);
        assert_eq!(content.phial_attribute_tag("ashenHalo"), Some(AttributeId::Might));
        assert_eq!(content.phial_attribute_tag("soulSalvo"), None);
    }

    #[test]
    fn rejects_invalid_toml() {
        assert!(matches!(
            Content::from_toml("[[tree_nodes]]\nattribute = \"Luck\"\nid = \"x\""),
            Err(ProfileError::Config(_))
        ));
    }
}
