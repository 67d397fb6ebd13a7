//! Exponential leveling curves.
//!
//! Leveling from level `L` costs `floor(base * growth^L)` XP. Attribute and
//! weapon tracks use independent curves from the mastery configuration.

use serde::{Deserialize, Serialize};

use crate::profile::MasteryTrack;

/// Upper bound on banked XP.
pub const MAX_TRACK_XP: u64 = 1_000_000_000;
/// Upper bound on a track's level.
pub const MAX_TRACK_LEVEL: u64 = 10_000;

/// Requirement curve parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelCurve {
    /// XP needed to leave level 0. Values below 1 are raised to 1.
    pub req_base: f64,
    /// Per-level multiplier. Values below 1.01 are raised to 1.01.
    pub req_growth: f64,
}

impl LevelCurve {
    /// Default curve for attribute tracks.
    pub const ATTRIBUTE: Self = Self {
        req_base: 120.0,
        req_growth: 1.25,
    };

    /// Default curve for weapon tracks.
    pub const WEAPON: Self = Self {
        req_base: 160.0,
        req_growth: 1.28,
    };

    /// XP needed to advance from `level` to `level + 1`. Never below 1.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_possible_wrap)]
    pub fn requirement(&self, level: u64) -> u64 {
        let base = if self.req_base.is_finite() { self.req_base.max(1.0) } else { 1.0 };
        let growth = if self.req_growth.is_finite() {
            self.req_growth.max(1.01)
        } else {
            1.01
        };
        let exp = level.min(MAX_TRACK_LEVEL) as i32;
        // Float-to-int casts saturate, so huge requirements cap at u64::MAX.
        ((base * growth.powi(exp)).floor() as u64).max(1)
    }
}

/// Outcome of [`add_xp_to_track`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackGain {
    /// XP actually added.
    pub gained_xp: u64,
    /// Levels gained.
    pub gained_levels: u64,
}

/// Bank `xp` on `track` and convert it into levels one at a time.
///
/// Afterwards `track.xp < curve.requirement(track.level)` holds, unless the
/// track hit [`MAX_TRACK_LEVEL`].
pub fn add_xp_to_track(track: &mut MasteryTrack, xp: u64, curve: &LevelCurve) -> TrackGain {
    let add = xp.min(MAX_TRACK_XP);
    if add == 0 {
        return TrackGain::default();
    }
    track.xp = track.xp.saturating_add(add).min(MAX_TRACK_XP);

    let mut gained_levels = 0;
    while track.level < MAX_TRACK_LEVEL {
        let req = curve.requirement(track.level);
        if track.xp < req {
            break;
        }
        track.xp -= req;
        track.level += 1;
        gained_levels += 1;
    }

    TrackGain {
        gained_xp: add,
        gained_levels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requirement_grows_exponentially() {
        let c = LevelCurve::ATTRIBUTE;
        assert_eq!(c.requirement(0), 120);
        assert_eq!(c.requirement(1), 150);
        assert_eq!(c.requirement(2), 187);
        assert!(c.requirement(10) > c.requirement(9));
    }

    #[test]
    fn degenerate_curves_are_clamped() {
        let c = LevelCurve {
            req_base: 0.0,
            req_growth: 0.5,
        };
        assert_eq!(c.requirement(0), 1);
        assert!(c.requirement(100) >= c.requirement(99));
        let nan = LevelCurve {
            req_base: f64::NAN,
            req_growth: f64::INFINITY,
        };
        assert_eq!(nan.requirement(0), 1);
    }

    #[test]
    fn levels_one_at_a_time() {
        let mut track = MasteryTrack::default();
        let gain = add_xp_to_track(&mut track, 120 + 150 + 10, &LevelCurve::ATTRIBUTE);
        assert_eq!(gain.gained_levels, 2);
        assert_eq!(track.level, 2);
        assert_eq!(track.xp, 10);
    }

    #[test]
    fn below_threshold_only_banks() {
        let mut track = MasteryTrack::default();
        let gain = add_xp_to_track(&mut track, 119, &LevelCurve::ATTRIBUTE);
        assert_eq!(gain.gained_levels, 0);
        assert_eq!(track.xp, 119);
        add_xp_to_track(&mut track, 1, &LevelCurve::ATTRIBUTE);
        assert_eq!((track.level, track.xp), (1, 0));
    }

    #[test]
    fn zero_grant_is_a_no_op() {
        let mut track = MasteryTrack {
            xp: 5,
            level: 3,
            ..MasteryTrack::default()
        };
        assert_eq!(add_xp_to_track(&mut track, 0, &LevelCurve::WEAPON), TrackGain::default());
        assert_eq!((track.xp, track.level), (5, 3));
    }

    #[test]
    fn huge_grant_terminates_with_invariant() {
        let mut track = MasteryTrack::default();
        let curve = LevelCurve::WEAPON;
        add_xp_to_track(&mut track, u64::MAX, &curve);
        assert!(track.xp < curve.requirement(track.level));
        assert!(track.level > 0);
    }
}
