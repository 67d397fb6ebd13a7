//! Integration hooks for the game's run states and menus.
//!
//! Each hook builds the [`ProgressionEvent`] for one game-side moment, so
//! call sites stay one line long.

use soulcycle_core::mastery::RunSnapshot;
use soulcycle_core::types::{AttributeId, EndReason};

use crate::events::ProgressionEvent;

/// The field boss fell.
#[must_use]
pub fn on_field_complete(snapshot: RunSnapshot) -> ProgressionEvent {
    on_run_end(snapshot, EndReason::FieldComplete)
}

/// The dungeon was cleared.
#[must_use]
pub fn on_dungeon_complete(snapshot: RunSnapshot) -> ProgressionEvent {
    on_run_end(snapshot, EndReason::DungeonComplete)
}

/// The dungeon timer or objective failed.
#[must_use]
pub fn on_dungeon_failed(snapshot: RunSnapshot) -> ProgressionEvent {
    on_run_end(snapshot, EndReason::DungeonFailed)
}

/// The player died.
#[must_use]
pub fn on_death(snapshot: RunSnapshot) -> ProgressionEvent {
    on_run_end(snapshot, EndReason::Death)
}

/// The player abandoned the run from the pause menu.
#[must_use]
pub fn on_forfeit(snapshot: RunSnapshot) -> ProgressionEvent {
    on_run_end(snapshot, EndReason::Forfeit)
}

/// The player restarted the run.
#[must_use]
pub fn on_restart(snapshot: RunSnapshot) -> ProgressionEvent {
    on_run_end(snapshot, EndReason::Restart)
}

/// Any other run end.
#[must_use]
pub fn on_run_end(snapshot: RunSnapshot, end_reason: EndReason) -> ProgressionEvent {
    ProgressionEvent::RunEnded { snapshot, end_reason }
}

/// A weapon was equipped in the armory.
#[must_use]
pub fn on_weapon_equipped(weapon_cls: impl Into<String>) -> ProgressionEvent {
    ProgressionEvent::WeaponEquipped {
        weapon_cls: weapon_cls.into(),
    }
}

/// The attunement selector changed.
#[must_use]
pub fn on_attunement_selected(attribute: Option<AttributeId>) -> ProgressionEvent {
    ProgressionEvent::AttunementSelected { attribute }
}

/// A tree node was clicked in the mastery screen.
#[must_use]
pub fn on_node_unlock(attribute: AttributeId, node_id: impl Into<String>) -> ProgressionEvent {
    ProgressionEvent::NodeUnlockRequested {
        attribute,
        node_id: node_id.into(),
    }
}
