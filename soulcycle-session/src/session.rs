//! One play session: the active profile and everything that mutates it.

use std::path::Path;

use soulcycle_core::content::{TreeNodeDef, normalize_weapon_cls};
use soulcycle_core::flags::META_MASTERY_ENABLED;
use soulcycle_core::mastery::{self, MasteryGain, RunResult, RunSnapshot};
use soulcycle_core::persistence::{ProfileStorage, ProfileStore, SaveOptions, SqliteStorage};
use soulcycle_core::tree::{active_nodes, exclusive_groups};
use soulcycle_core::types::{AttributeId, EndReason};
use soulcycle_core::{Content, FeatureFlags, FlagReader, Profile, SoulCycleConfig};
use tracing::{debug, info, warn};

use crate::error::{Result, SessionError};
use crate::events::{EventOutcome, ProgressionEvent};

/// Owns the active profile between load and save.
#[derive(Debug)]
pub struct Session<S> {
    store: ProfileStore<S>,
    profile: Profile,
    config: SoulCycleConfig,
    flags: FeatureFlags,
}

impl Session<SqliteStorage> {
    /// Open the SQLite store named by `config.persistence.db_path` and load
    /// the profile from it.
    ///
    /// # Errors
    /// Returns [`SessionError::Profile`] if the database cannot be opened.
    pub fn open(config: SoulCycleConfig, content: Content) -> Result<Self> {
        let storage = SqliteStorage::open(Path::new(&config.persistence.db_path), &config.persistence)?;
        Ok(Self::start(storage, config, content))
    }
}

impl<S: ProfileStorage> Session<S> {
    /// Load (and if needed migrate) the profile from `storage`.
    pub fn start(storage: S, config: SoulCycleConfig, content: Content) -> Self {
        let store = ProfileStore::new(storage, &config.persistence, content);
        let flags = FeatureFlags::with_overrides(config.flags.clone());
        let profile = store.load();
        info!(
            version = profile.schema_version,
            meta_mastery = flags.is_on(META_MASTERY_ENABLED),
            "Session started"
        );
        Self {
            store,
            profile,
            config,
            flags,
        }
    }

    /// The active profile.
    #[must_use]
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Mutable access for gameplay systems; persisted on the next save.
    pub fn profile_mut(&mut self) -> &mut Profile {
        &mut self.profile
    }

    /// Effective feature flags.
    #[must_use]
    pub fn flags(&self) -> &FeatureFlags {
        &self.flags
    }

    /// Flip flags at runtime (debug menus, tests).
    pub fn flags_mut(&mut self) -> &mut FeatureFlags {
        &mut self.flags
    }

    /// Loaded configuration.
    #[must_use]
    pub fn config(&self) -> &SoulCycleConfig {
        &self.config
    }

    /// Content tables in use.
    #[must_use]
    pub fn content(&self) -> &Content {
        self.store.content()
    }

    /// The profile store.
    #[must_use]
    pub fn store(&self) -> &ProfileStore<S> {
        &self.store
    }

    /// Save the active profile, backing up the previous one.
    ///
    /// # Errors
    /// Returns [`SessionError::Profile`] if the write fails.
    pub fn save(&mut self) -> Result<()> {
        self.store.save(&mut self.profile, SaveOptions::default())?;
        Ok(())
    }

    /// Apply one game event.
    ///
    /// Events that [save immediately](ProgressionEvent::saves_immediately)
    /// write the profile before returning.
    ///
    /// # Errors
    /// Whatever the specific handler returns; see [`Self::finish_run`] and
    /// [`Self::unlock_node`].
    pub fn handle(&mut self, event: ProgressionEvent) -> Result<EventOutcome> {
        debug!(kind = event.kind(), "Handling progression event");
        match event {
            ProgressionEvent::RunEnded { snapshot, end_reason } => {
                self.finish_run(&snapshot, end_reason).map(EventOutcome::RunRecorded)
            }
            ProgressionEvent::WeaponEquipped { weapon_cls } => {
                self.equip_weapon(&weapon_cls);
                Ok(EventOutcome::Applied)
            }
            ProgressionEvent::AttunementSelected { attribute } => {
                self.profile.armory.attunement = attribute;
                Ok(EventOutcome::Applied)
            }
            ProgressionEvent::NodeUnlockRequested { attribute, node_id } => {
                self.unlock_node(attribute, &node_id)?;
                Ok(EventOutcome::Applied)
            }
            ProgressionEvent::CameraZoomChanged { zoom } => {
                self.profile.settings.camera_zoom = zoom.filter(|z| z.is_finite());
                Ok(EventOutcome::Applied)
            }
        }
    }

    /// Record the equipped weapon class, in canonical form.
    pub fn equip_weapon(&mut self, weapon_cls: &str) {
        let cls = normalize_weapon_cls(weapon_cls);
        if self.store.content().weapon_config(&cls).is_none() {
            warn!(weapon_cls = %cls, "Equipped weapon class has no mastery track");
        }
        self.profile.armory.loadout.weapon_cls = Some(cls);
    }

    /// Build the run result, grant mastery, record history and save.
    ///
    /// A run that grants nothing (meta mastery disabled, a forfeit without
    /// grant, zero XP) leaves tracks and history untouched. The profile is
    /// updated in memory even when the save fails.
    ///
    /// # Errors
    /// Returns [`SessionError::Profile`] if the save fails.
    pub fn finish_run(&mut self, snapshot: &RunSnapshot, end_reason: EndReason) -> Result<MasteryGain> {
        let run: RunResult = mastery::compute_run_result(snapshot, end_reason, self.store.content());

        let gain = if self.flags.is_on(META_MASTERY_ENABLED) {
            mastery::apply_meta_progression(&mut self.profile, &run, &self.config.mastery)
        } else {
            debug!(run_id = run.run_id, "Meta mastery disabled; run not recorded");
            MasteryGain::NONE
        };

        self.save()?;
        Ok(gain)
    }

    /// Unspent points in one attribute tree.
    #[must_use]
    pub fn points_available(&self, attribute: AttributeId) -> u64 {
        mastery::attribute_points_available(&self.profile, attribute, &self.flags)
    }

    /// Unlocked nodes of one attribute that take effect, in content order.
    #[must_use]
    pub fn active_nodes(&self, attribute: AttributeId) -> Vec<&TreeNodeDef> {
        let content = self.store.content();
        self.profile
            .mastery
            .attribute_trees
            .get(&attribute)
            .map(|tree| active_nodes(tree, attribute, content))
            .unwrap_or_default()
    }

    /// Unlock a tree node, spending one point, and save.
    ///
    /// Unlocking a member of an exclusive group selects it for that group.
    ///
    /// # Errors
    /// Returns a [`SessionError`] describing why the node cannot be unlocked,
    /// or [`SessionError::Profile`] if the save fails.
    pub fn unlock_node(&mut self, attribute: AttributeId, node_id: &str) -> Result<()> {
        if !self.flags.is_on(META_MASTERY_ENABLED) {
            return Err(SessionError::MasteryDisabled);
        }
        let node_id = node_id.trim();
        let Some(node) = self
            .store
            .content()
            .tree_nodes(attribute)
            .find(|n| n.id == node_id)
            .cloned()
        else {
            return Err(SessionError::UnknownNode {
                attribute,
                node_id: node_id.to_string(),
            });
        };

        let tree = self.profile.mastery.attribute_trees.entry(attribute).or_default();
        if tree.unlocked.iter().any(|id| id == node_id) {
            return Err(SessionError::AlreadyUnlocked(node_id.to_string()));
        }
        if self.points_available(attribute) == 0 {
            return Err(SessionError::NoPointsAvailable(attribute));
        }

        let tree = self.profile.mastery.attribute_trees.entry(attribute).or_default();
        if let Some(group) = node.exclusive_group.as_deref().map(str::trim).filter(|g| !g.is_empty()) {
            let taken = exclusive_groups(self.store.content(), attribute)
                .remove(group)
                .unwrap_or_default()
                .into_iter()
                .find(|member| tree.unlocked.contains(member));
            if let Some(selected) = taken {
                return Err(SessionError::ExclusiveGroupTaken {
                    group: group.to_string(),
                    selected,
                });
            }
            tree.selected_exclusive.insert(group.to_string(), node.id.clone());
        }
        tree.unlocked.push(node.id.clone());
        *tree.spent_by_node_id.entry(node.id.clone()).or_insert(0.0) += 1.0;

        info!(attribute = %attribute, node = %node.id, "Tree node unlocked");
        self.save()
    }

    /// Save and give the storage back.
    ///
    /// # Errors
    /// Returns [`SessionError::Profile`] if the final save fails.
    pub fn close(mut self) -> Result<S> {
        self.save()?;
        Ok(self.store.into_storage())
    }
}
