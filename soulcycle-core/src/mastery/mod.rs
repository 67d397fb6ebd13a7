//! Mastery progression: turning a finished run into track XP.
//!
//! A run earns `mastery_xp` from kills, level reached, souls gained and an
//! end-reason bonus. The weapon's primary attribute takes 70% of it; the rest
//! (the choice share) is split across attributes in proportion to the phial
//! stacks picked during the run. The weapon's own track receives the full
//! amount.

pub mod curve;
pub mod distribution;
pub mod run;

use serde::{Deserialize, Serialize};
use serde_json::Map;
use tracing::{debug, info};

use crate::config::MasteryConfig;
use crate::flags::{FlagReader, META_MASTERY_ENABLED};
use crate::profile::{Profile, RunHistoryEntry};
use crate::sanitize::clamp_u64;
use crate::types::{AttributeId, EndReason, WeaponId};

pub use curve::{LevelCurve, TrackGain, add_xp_to_track};
pub use distribution::distribute_exact;
pub use run::{PhialPick, RunResult, RunSnapshot, compute_run_result};

/// Upper bound on XP granted by one run.
pub const MAX_RUN_XP: u64 = 1_000_000_000;

/// Weapon share as a fraction `NUM / DEN` of the run's mastery XP.
const WEAPON_SHARE_NUM: u64 = 7;
const WEAPON_SHARE_DEN: u64 = 10;

/// What a run granted, for UI and telemetry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryGain {
    /// Whether any track changed.
    pub gained: bool,
    /// Total XP granted.
    pub mastery_xp: u64,
}

impl MasteryGain {
    /// Nothing granted.
    pub const NONE: Self = Self {
        gained: false,
        mastery_xp: 0,
    };
}

fn finite(n: f64) -> f64 {
    if n.is_finite() { n } else { 0.0 }
}

/// XP earned by a run before it is split, clamped to `0..=MAX_RUN_XP`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn compute_mastery_xp(run: &RunResult, config: &MasteryConfig) -> u64 {
    let soul_delta = finite(run.souls_delta).max(0.0);
    let performance = finite(config.xp_base)
        + run.kills as f64 * finite(config.xp_per_kill)
        + run.reached_level as f64 * finite(config.xp_per_reached_level)
        + soul_delta * finite(config.xp_per_soul_delta);

    let bonus = match run.end_reason {
        EndReason::FieldComplete => finite(config.field_complete_bonus),
        EndReason::DungeonComplete => finite(config.dungeon_complete_bonus),
        EndReason::DungeonFailed => finite(config.dungeon_failed_bonus),
        _ => 0.0,
    };

    clamp_u64(performance.floor() + bonus, MAX_RUN_XP)
}

/// Attribute weights from the run's tagged phial picks, first-seen order.
#[must_use]
pub fn phial_weights(run: &RunResult) -> Vec<(AttributeId, u64)> {
    let mut weights = Vec::new();
    for pick in &run.picked_phials {
        let Some(attr) = pick.attribute_tag else {
            continue;
        };
        if pick.stacks == 0 {
            continue;
        }
        distribution::accumulate(&mut weights, attr, pick.stacks);
    }
    weights
}

/// Apply a finished run to the profile's mastery tracks and history.
///
/// Returns [`MasteryGain::NONE`] without touching the profile when the run
/// was forfeited and forfeits do not grant, or when it earned no XP.
pub fn apply_meta_progression(profile: &mut Profile, run: &RunResult, config: &MasteryConfig) -> MasteryGain {
    if run.end_reason.is_forfeit_like() && !config.grant_on_forfeit {
        debug!(end_reason = %run.end_reason, "Forfeited run grants no mastery");
        return MasteryGain::NONE;
    }

    let mastery_xp = compute_mastery_xp(run, config);
    if mastery_xp == 0 {
        return MasteryGain::NONE;
    }

    let weapon_attr = run.weapon_primary_attribute.unwrap_or(AttributeId::Might);
    let weapon_share = mastery_xp * WEAPON_SHARE_NUM / WEAPON_SHARE_DEN;
    let choice_share = mastery_xp - weapon_share;

    let weights = phial_weights(run);
    let choice = distribute_exact(choice_share, &weights, weapon_attr);

    let attr_curve = config.attribute_curve;
    add_xp_to_track(profile.attribute_track_mut(weapon_attr), weapon_share, &attr_curve);
    for (attr, xp) in &choice {
        add_xp_to_track(profile.attribute_track_mut(*attr), *xp, &attr_curve);
    }

    if let Some(weapon) = run.weapon_id {
        let gain = add_xp_to_track(profile.weapon_track_mut(weapon), mastery_xp, &config.weapon_curve);
        debug!(weapon = %weapon, levels = gain.gained_levels, "Weapon mastery advanced");
    }

    append_run_history(profile, run, Some(mastery_xp), config.history_limit());

    info!(
        run_id = run.run_id,
        end_reason = %run.end_reason,
        mastery_xp,
        weapon_share,
        choice_share,
        weighted_attributes = weights.len(),
        "Mastery granted"
    );

    MasteryGain {
        gained: true,
        mastery_xp,
    }
}

/// Prepend a run to the history, keeping at most `max` entries.
pub fn append_run_history(profile: &mut Profile, run: &RunResult, mastery_xp: Option<u64>, max: usize) {
    let runs = &mut profile.history.recent_runs;
    runs.insert(
        0,
        RunHistoryEntry {
            run: run.clone(),
            mastery_xp,
            extra: Map::new(),
        },
    );
    runs.truncate(max.max(1));
}

/// Current level of a weapon's mastery track.
#[must_use]
pub fn weapon_mastery_level(profile: &Profile, weapon: WeaponId) -> u64 {
    profile.mastery.weapons.get(&weapon).map_or(0, |t| t.level)
}

/// Points spent in an attribute tree: one per distinct unlocked node.
#[must_use]
pub fn attribute_points_spent(profile: &Profile, attribute: AttributeId) -> u64 {
    profile.mastery.attribute_trees.get(&attribute).map_or(0, |tree| {
        let mut seen: Vec<&str> = tree
            .unlocked
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .collect();
        seen.sort_unstable();
        seen.dedup();
        seen.len() as u64
    })
}

/// Unspent points in an attribute tree: track level minus points spent.
///
/// Always 0 while meta mastery is disabled.
#[must_use]
pub fn attribute_points_available(profile: &Profile, attribute: AttributeId, flags: &impl FlagReader) -> u64 {
    if !flags.is_on(META_MASTERY_ENABLED) {
        return 0;
    }
    let level = profile.mastery.attributes.get(&attribute).map_or(0, |t| t.level);
    level.saturating_sub(attribute_points_spent(profile, attribute))
}
