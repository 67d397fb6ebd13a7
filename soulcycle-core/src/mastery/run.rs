//! Run results and how they are assembled from live run state.

use serde::{Deserialize, Serialize};

use crate::content::{Content, normalize_weapon_cls};
use crate::sanitize::lenient;
use crate::types::{AttributeId, EndReason, RunMode, WeaponId};

/// Version of the run-result record.
pub const RUN_RESULT_SCHEMA_VERSION: u64 = 1;

/// Highest level a run can report.
pub const MAX_REACHED_LEVEL: u64 = 999;
/// Highest kill count a run can report.
pub const MAX_KILLS: u64 = 1_000_000;
/// Highest stack count of a single phial.
pub const MAX_PHIAL_STACKS: u64 = 999;

/// One phial picked during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhialPick {
    /// Phial id.
    pub id: String,
    /// Stacks held at run end.
    #[serde(default, deserialize_with = "lenient::counter")]
    pub stacks: u64,
    /// Attribute this phial weights toward; `None` means no weighting.
    #[serde(default, deserialize_with = "lenient::optional_attribute")]
    pub attribute_tag: Option<AttributeId>,
}

/// Summary of one completed run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    /// Record version.
    #[serde(default, deserialize_with = "lenient::counter")]
    pub schema_version: u64,
    /// Run counter supplied by the game.
    #[serde(default, deserialize_with = "lenient::counter")]
    pub run_id: u64,
    /// Field, dungeon or unknown.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub mode: RunMode,
    /// Why the run ended.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub end_reason: EndReason,
    /// Run length in seconds.
    #[serde(default, deserialize_with = "lenient::number")]
    pub duration_sec: f64,
    /// Character level reached.
    #[serde(default, deserialize_with = "lenient::counter")]
    pub reached_level: u64,
    /// Enemies killed.
    #[serde(default, deserialize_with = "lenient::counter")]
    pub kills: u64,
    /// Weapon class as the game reported it.
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub weapon_cls: Option<String>,
    /// Canonical weapon.
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub weapon_id: Option<WeaponId>,
    /// The weapon's primary attribute.
    #[serde(default, deserialize_with = "lenient::optional_attribute")]
    pub weapon_primary_attribute: Option<AttributeId>,
    /// Souls held when the run started.
    #[serde(default, deserialize_with = "lenient::number")]
    pub souls_start: f64,
    /// Souls held when the run ended.
    #[serde(default, deserialize_with = "lenient::number")]
    pub souls_end: f64,
    /// `souls_end - souls_start`.
    #[serde(default, deserialize_with = "lenient::number")]
    pub souls_delta: f64,
    /// Phials picked, in pick order.
    #[serde(default, deserialize_with = "lenient::filtered_vec")]
    pub picked_phials: Vec<PhialPick>,
}

/// Read-only view of a finished run, supplied by the game's run state.
///
/// The mode is reported explicitly by whichever run state is active.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSnapshot {
    /// Run counter.
    pub run_id: u64,
    /// Active run mode.
    pub mode: RunMode,
    /// Elapsed run time in seconds.
    pub elapsed_sec: f64,
    /// Player level.
    pub player_level: u64,
    /// Kills this session.
    pub kills: u64,
    /// Souls held at run start.
    pub souls_start: f64,
    /// Souls held now.
    pub souls_end: f64,
    /// Weapon class of the equipped weapon.
    pub weapon_cls: Option<String>,
    /// Phial id to stacks, in pick order.
    pub phial_stacks: Vec<(String, u64)>,
}

fn finite_or_zero(n: f64) -> f64 {
    if n.is_finite() { n } else { 0.0 }
}

/// Build a [`RunResult`] from a finished run.
///
/// The weapon class is stored in canonical form and resolves through the
/// content weapon table (legacy aliases included); phials without stacks are skipped and the rest are tagged with
/// their content attribute, if any.
#[must_use]
pub fn compute_run_result(snapshot: &RunSnapshot, end_reason: EndReason, content: &Content) -> RunResult {
    let weapon = snapshot
        .weapon_cls
        .as_deref()
        .and_then(|cls| content.weapon_config(cls));

    let souls_start = finite_or_zero(snapshot.souls_start);
    let souls_end = finite_or_zero(snapshot.souls_end);

    let picked_phials = snapshot
        .phial_stacks
        .iter()
        .filter(|(_, stacks)| *stacks > 0)
        .map(|(id, stacks)| PhialPick {
            id: id.clone(),
            stacks: (*stacks).min(MAX_PHIAL_STACKS),
            attribute_tag: content.phial_attribute_tag(id),
        })
        .collect();

    RunResult {
        schema_version: RUN_RESULT_SCHEMA_VERSION,
        run_id: snapshot.run_id,
        mode: snapshot.mode,
        end_reason,
        duration_sec: finite_or_zero(snapshot.elapsed_sec).max(0.0),
        reached_level: snapshot.player_level.clamp(1, MAX_REACHED_LEVEL),
        kills: snapshot.kills.min(MAX_KILLS),
        weapon_cls: snapshot
            .weapon_cls
            .as_deref()
            .map(normalize_weapon_cls)
            .filter(|cls| !cls.is_empty()),
        weapon_id: weapon.map(|w| w.weapon_id),
        weapon_primary_attribute: weapon.map(|w| w.primary_attribute),
        souls_start,
        souls_end,
        souls_delta: souls_end - souls_start,
        picked_phials,
    }
}
