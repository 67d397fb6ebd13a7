//! Exclusive-group repair for attribute trees.
//!
//! Content may declare a node as a member of an exclusive group: at most one
//! member of the group may be unlocked. Saves written before a group existed,
//! or by buggy builds, can violate that. Repair keeps one winner per group,
//! preferring the player's recorded selection, and silently drops the rest.

use std::collections::{BTreeMap, HashSet};

use serde_json::Value;
use tracing::debug;

use crate::content::{Content, TreeNodeDef};
use crate::profile::AttributeTree;
use crate::sanitize;
use crate::types::AttributeId;

/// Group id to member node ids, in content order.
#[must_use]
pub fn exclusive_groups(content: &Content, attribute: AttributeId) -> BTreeMap<String, Vec<String>> {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for node in content.tree_nodes(attribute) {
        let Some(group) = node.exclusive_group.as_deref().map(str::trim) else {
            continue;
        };
        if group.is_empty() || node.id.trim().is_empty() {
            continue;
        }
        let members = groups.entry(group.to_string()).or_default();
        if !members.iter().any(|m| m == node.id.trim()) {
            members.push(node.id.trim().to_string());
        }
    }
    groups
}

/// Sanitize an untrusted tree value and repair its exclusive groups.
#[must_use]
pub fn normalize_exclusive_groups(attribute: AttributeId, tree: &Value, content: &Content) -> AttributeTree {
    let mut out = AttributeTree {
        unlocked: sanitize::sanitize_string_list(&tree["unlocked"]),
        selected_exclusive: sanitize::sanitize_string_map(&tree["selectedExclusive"]),
        spent_by_node_id: sanitize::sanitize_non_negative_number_map(&tree["spentByNodeId"]),
        ..AttributeTree::default()
    };
    out.normalize(attribute, content);
    out
}

impl AttributeTree {
    /// Enforce "at most one unlocked member per exclusive group".
    ///
    /// Idempotent. The winner of a group is the recorded selection if it is
    /// still unlocked, otherwise the earliest unlocked member.
    pub fn normalize(&mut self, attribute: AttributeId, content: &Content) {
        let groups = exclusive_groups(content, attribute);

        let mut seen = HashSet::new();
        self.unlocked.retain(|id| !id.trim().is_empty() && seen.insert(id.clone()));
        self.spent_by_node_id
            .retain(|_, spent| spent.is_finite() && *spent >= 0.0);
        self.selected_exclusive.retain(|group, _| groups.contains_key(group));

        let mut removed: HashSet<String> = HashSet::new();
        for (group, members) in &groups {
            let unlocked_members: Vec<&String> = self
                .unlocked
                .iter()
                .filter(|id| members.contains(id))
                .collect();

            if unlocked_members.is_empty() {
                self.selected_exclusive.remove(group);
                continue;
            }

            let winner = self
                .selected_exclusive
                .get(group)
                .filter(|sel| unlocked_members.contains(sel))
                .cloned()
                .unwrap_or_else(|| unlocked_members[0].clone());

            for id in unlocked_members {
                if *id != winner {
                    removed.insert(id.clone());
                }
            }
            self.selected_exclusive.insert(group.clone(), winner);
        }

        if !removed.is_empty() {
            debug!(
                attribute = %attribute,
                dropped = removed.len(),
                "Repaired exclusive-group violations"
            );
            self.unlocked.retain(|id| !removed.contains(id));
        }
    }
}

/// Unlocked nodes that take effect, in content order.
///
/// Read-side counterpart of [`AttributeTree::normalize`]: an unrepaired tree
/// still activates at most one member per exclusive group (the recorded
/// selection if unlocked, otherwise the first unlocked member in content
/// order). Unlocked ids with no content node are ignored.
#[must_use]
pub fn active_nodes<'c>(tree: &AttributeTree, attribute: AttributeId, content: &'c Content) -> Vec<&'c TreeNodeDef> {
    let unlocked: HashSet<&str> = tree.unlocked.iter().map(|id| id.trim()).collect();

    let mut picked: BTreeMap<&str, &str> = BTreeMap::new();
    for (group, node) in &tree.selected_exclusive {
        if unlocked.contains(node.as_str()) {
            picked.insert(group.as_str(), node.as_str());
        }
    }
    for node in content.tree_nodes(attribute) {
        if let Some(group) = node.exclusive_group.as_deref() {
            if unlocked.contains(node.id.as_str()) {
                picked.entry(group).or_insert(node.id.as_str());
            }
        }
    }

    content
        .tree_nodes(attribute)
        .filter(|node| unlocked.contains(node.id.as_str()))
        .filter(|node| {
            node.exclusive_group
                .as_deref()
                .and_then(|group| picked.get(group))
                .is_none_or(|winner| *winner == node.id)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn active_nodes_pick_one_per_group_without_repair() {
        let tree = AttributeTree {
            unlocked: vec!["duelist".into(), "root".into(), "brute".into(), "ghost".into()],
            selected_exclusive: BTreeMap::from([("stance".to_string(), "duelist".to_string())]),
            ..AttributeTree::default()
        };
        let content = content();
        let ids: Vec<&str> = active_nodes(&tree, AttributeId::Might, &content)
            .into_iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(ids, vec!["root", "duelist"]);

        let unselected = AttributeTree {
            selected_exclusive: BTreeMap::new(),
            ..tree
        };
        let ids: Vec<&str> = active_nodes(&unselected, AttributeId::Might, &content)
            .into_iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(ids, vec!["root", "brute"]);
    }

    fn content() -> Content {
        let node = |id: &str, group: Option<&str>| TreeNodeDef {
            attribute: AttributeId::Might,
            id: id.to_string(),
            exclusive_group: group.map(str::to_string),
        };
        Content {
            tree_nodes: vec![
                node("root", None),
                node("brute", Some("stance")),
                node("duelist", Some("stance")),
                node("bulwark", Some("stance")),
                node("ember", Some("rite")),
                node("ash", Some("rite")),
            ],
            ..Content::default()
        }
    }

    #[test]
    fn keeps_recorded_selection() {
        let tree = json!({
            "unlocked": ["root", "brute", "duelist", "bulwark"],
            "selectedExclusive": {"stance": "duelist"}
        });
        let out = normalize_exclusive_groups(AttributeId::Might, &tree, &content());
        assert_eq!(out.unlocked, vec!["root", "duelist"]);
        assert_eq!(out.selected_exclusive["stance"], "duelist");
    }

    #[test]
    fn falls_back_to_first_unlocked_member() {
        let tree = json!({
            "unlocked": ["bulwark", "root", "brute"],
            "selectedExclusive": {"stance": "duelist"}
        });
        let out = normalize_exclusive_groups(AttributeId::Might, &tree, &content());
        assert_eq!(out.unlocked, vec!["bulwark", "root"]);
        assert_eq!(out.selected_exclusive["stance"], "bulwark");
    }

    #[test]
    fn drops_stale_and_undeclared_selections() {
        let tree = json!({
            "unlocked": ["root"],
            "selectedExclusive": {"stance": "brute", "retired": "old", "rite": "ash"}
        });
        let out = normalize_exclusive_groups(AttributeId::Might, &tree, &content());
        assert_eq!(out.unlocked, vec!["root"]);
        assert!(out.selected_exclusive.is_empty());
    }

    #[test]
    fn sanitizes_garbage() {
        let tree = json!({
            "unlocked": "root",
            "selectedExclusive": [1],
            "spentByNodeId": {"root": -2, "brute": "x", "ember": 3}
        });
        let out = normalize_exclusive_groups(AttributeId::Might, &tree, &content());
        assert!(out.unlocked.is_empty());
        assert!(out.selected_exclusive.is_empty());
        assert_eq!(out.spent_by_node_id.get("root"), Some(&0.0));
        assert_eq!(out.spent_by_node_id.get("ember"), Some(&3.0));
        assert!(!out.spent_by_node_id.contains_key("brute"));
    }

    #[test]
    fn is_idempotent() {
        let tree = json!({
            "unlocked": ["ash", "brute", "ember", "duelist", "root"],
            "selectedExclusive": {"rite": "ember"}
        });
        let once = normalize_exclusive_groups(AttributeId::Might, &tree, &content());
        let mut twice = once.clone();
        twice.normalize(AttributeId::Might, &content());
        assert_eq!(once, twice);
        assert_eq!(once.unlocked, vec!["brute", "ember", "root"]);
    }

    #[test]
    fn other_attributes_are_unconstrained() {
        let tree = json!({"unlocked": ["brute", "duelist"]});
        let out = normalize_exclusive_groups(AttributeId::Will, &tree, &content());
        assert_eq!(out.unlocked, vec!["brute", "duelist"]);
    }
}
