//! Core vocabulary shared by the profile, the migrations and the mastery engine.
//!
//! Every type here serializes to the exact string the save format uses, so a
//! profile written by the game stays readable by any tool built on this crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Attributes
// ---------------------------------------------------------------------------

/// One of the four character attributes that own a mastery track and a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AttributeId {
    /// Raw power.
    Might,
    /// Soul affinity.
    Will,
    /// Speed and tempo.
    Alacrity,
    /// Health and resilience.
    Constitution,
}

impl AttributeId {
    /// All attributes in canonical order.
    pub const ALL: [Self; 4] = [Self::Might, Self::Will, Self::Alacrity, Self::Constitution];

    /// The identifier as stored in saves and content tables.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Might => "Might",
            Self::Will => "Will",
            Self::Alacrity => "Alacrity",
            Self::Constitution => "Constitution",
        }
    }
}

impl fmt::Display for AttributeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttributeId {
    type Err = UnknownId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| UnknownId(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Weapons
// ---------------------------------------------------------------------------

/// Canonical weapon identity. Each weapon owns a mastery track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WeaponId {
    /// Melee, Might-aligned.
    Hammer,
    /// Caster, Will-aligned.
    Staff,
    /// Ranged, Alacrity-aligned. Formerly known as the pistol.
    Repeater,
    /// Reaper, Constitution-aligned.
    Scythe,
}

impl WeaponId {
    /// All weapons in canonical order.
    pub const ALL: [Self; 4] = [Self::Hammer, Self::Staff, Self::Repeater, Self::Scythe];

    /// The identifier as stored in saves and content tables.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hammer => "Hammer",
            Self::Staff => "Staff",
            Self::Repeater => "Repeater",
            Self::Scythe => "Scythe",
        }
    }
}

impl fmt::Display for WeaponId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeaponId {
    type Err = UnknownId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|w| w.as_str() == s)
            .ok_or_else(|| UnknownId(s.to_string()))
    }
}

/// Returned when a string names no known attribute or weapon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownId(pub String);

impl fmt::Display for UnknownId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown id: {:?}", self.0)
    }
}

impl std::error::Error for UnknownId {}

// ---------------------------------------------------------------------------
// Runs
// ---------------------------------------------------------------------------

/// Which kind of run produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Wave-based field run.
    Field,
    /// Timed dungeon rift.
    Dungeon,
    /// Anything else (training, menus, unknown saves).
    #[default]
    #[serde(other)]
    Unknown,
}

/// Why a run ended. Stored as a free-form tag; the known tags get variants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EndReason {
    /// All field waves cleared.
    FieldComplete,
    /// Dungeon rift cleared.
    DungeonComplete,
    /// Dungeon timer ran out.
    DungeonFailed,
    /// The player died.
    Death,
    /// The player abandoned the run.
    Forfeit,
    /// The player restarted the run.
    Restart,
    /// Any other tag, kept verbatim.
    Other(String),
    /// No reason recorded.
    #[default]
    Unknown,
}

impl EndReason {
    /// The tag as stored in run results.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::FieldComplete => "fieldComplete",
            Self::DungeonComplete => "dungeonComplete",
            Self::DungeonFailed => "dungeonFailed",
            Self::Death => "death",
            Self::Forfeit => "forfeit",
            Self::Restart => "restart",
            Self::Other(tag) => tag,
            Self::Unknown => "unknown",
        }
    }

    /// Abandoned runs may be excluded from mastery grants.
    #[must_use]
    pub fn is_forfeit_like(&self) -> bool {
        matches!(self, Self::Forfeit | Self::Restart)
    }
}

impl From<&str> for EndReason {
    fn from(tag: &str) -> Self {
        match tag.trim() {
            "fieldComplete" => Self::FieldComplete,
            "dungeonComplete" => Self::DungeonComplete,
            "dungeonFailed" => Self::DungeonFailed,
            "death" => Self::Death,
            "forfeit" => Self::Forfeit,
            "restart" => Self::Restart,
            "" | "unknown" => Self::Unknown,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for EndReason {
    fn from(tag: String) -> Self {
        Self::from(tag.as_str())
    }
}

impl From<EndReason> for String {
    fn from(reason: EndReason) -> Self {
        reason.as_str().to_string()
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_round_trips_through_strings() {
        for attr in AttributeId::ALL {
            assert_eq!(attr.as_str().parse::<AttributeId>(), Ok(attr));
        }
        assert!("might".parse::<AttributeId>().is_err());
    }

    #[test]
    fn end_reason_keeps_unknown_tags() {
        let reason = EndReason::from("bossRush");
        assert_eq!(reason, EndReason::Other("bossRush".to_string()));
        assert_eq!(String::from(reason), "bossRush");
    }

    #[test]
    fn restart_counts_as_forfeit() {
        assert!(EndReason::Restart.is_forfeit_like());
        assert!(EndReason::Forfeit.is_forfeit_like());
        assert!(!EndReason::Death.is_forfeit_like());
    }

    #[test]
    fn run_mode_tolerates_unknown_tags() {
        let mode: RunMode = serde_json::from_str("\"arena\"").expect("parse");
        assert_eq!(mode, RunMode::Unknown);
        let mode: RunMode = serde_json::from_str("\"dungeon\"").expect("parse");
        assert_eq!(mode, RunMode::Dungeon);
    }
}
