//! Game events that touch the persistent profile.
//!
//! The run states and menus emit these; [`crate::Session::handle`] applies
//! them to the active profile.

use soulcycle_core::mastery::{MasteryGain, RunSnapshot};
use soulcycle_core::types::{AttributeId, EndReason};

/// An event the progression layer reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressionEvent {
    /// A field or dungeon run finished, for any reason.
    RunEnded {
        snapshot: RunSnapshot,
        end_reason: EndReason,
    },

    /// The player equipped a weapon in the armory.
    WeaponEquipped { weapon_cls: String },

    /// The player picked (or cleared) the global attunement.
    AttunementSelected { attribute: Option<AttributeId> },

    /// The player asked to unlock an attribute-tree node.
    NodeUnlockRequested { attribute: AttributeId, node_id: String },

    /// The camera zoom preference changed.
    CameraZoomChanged { zoom: Option<f64> },
}

impl ProgressionEvent {
    /// Short name for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RunEnded { .. } => "run_ended",
            Self::WeaponEquipped { .. } => "weapon_equipped",
            Self::AttunementSelected { .. } => "attunement_selected",
            Self::NodeUnlockRequested { .. } => "node_unlock_requested",
            Self::CameraZoomChanged { .. } => "camera_zoom_changed",
        }
    }

    /// Whether handling this event saves the profile right away.
    ///
    /// Armory and settings edits are batched until the next explicit save.
    #[must_use]
    pub fn saves_immediately(&self) -> bool {
        matches!(self, Self::RunEnded { .. } | Self::NodeUnlockRequested { .. })
    }
}

/// What handling an event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// A run was recorded; carries the mastery granted.
    RunRecorded(MasteryGain),
    /// The profile changed in memory.
    Applied,
}
