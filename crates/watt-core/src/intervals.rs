//! Symbolic pitch intervals and their resolution to toe positions.
//!
//! Each pitch-shifting effect covers a fixed semitone range, mapped linearly
//! onto the toe axis (0 = heel, 127 = full toe). A symbolic interval is only
//! meaningful for effects whose range contains it; resolution is performed
//! through an [`IntervalMap`] keyed by effect.

use crate::command::Effect;
use std::collections::HashMap;
use std::fmt;

/// A pitch interval in semitones relative to unison.
///
/// Positive values are ascending, negative descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Interval(pub i8);

/// Unison
pub const P1: Interval = Interval(0);
/// Minor second up
pub const MIN2: Interval = Interval(1);
/// Major second up
pub const MAJ2: Interval = Interval(2);
/// Minor third up
pub const MIN3: Interval = Interval(3);
/// Major third up
pub const MAJ3: Interval = Interval(4);
/// Perfect fourth up
pub const P4: Interval = Interval(5);
/// Augmented fourth up
pub const AUG4: Interval = Interval(6);
/// Perfect fifth up
pub const P5: Interval = Interval(7);
/// Minor sixth up
pub const MIN6: Interval = Interval(8);
/// Major sixth up
pub const MAJ6: Interval = Interval(9);
/// Minor seventh up
pub const MIN7: Interval = Interval(10);
/// Major seventh up
pub const MAJ7: Interval = Interval(11);
/// Octave up
pub const P8: Interval = Interval(12);
/// Minor ninth up
pub const MIN9: Interval = Interval(13);
/// Major ninth up
pub const MAJ9: Interval = Interval(14);
/// Minor tenth up
pub const MIN10: Interval = Interval(15);
/// Major tenth up
pub const MAJ10: Interval = Interval(16);
/// Perfect eleventh up
pub const P11: Interval = Interval(17);
/// Double octave up
pub const P15: Interval = Interval(24);
/// Octave down
pub const D_P8: Interval = Interval(-12);
/// Double octave down
pub const D_P15: Interval = Interval(-24);
/// Triple octave down
pub const D_P22: Interval = Interval(-36);

/// Lowest interval representable on any effect (bottom of the dive bomb)
pub const CHROMATIC_MIN: i8 = -36;

/// Highest interval representable on any effect (top of the two-octave shift)
pub const CHROMATIC_MAX: i8 = 24;

/// Toe position that silences the pedal when the dive-bomb patch is active
pub const MUTE: u8 = 127;

/// The ionian (major) scale as intervals from the tonic
pub const IONIAN: [Interval; 8] = [P1, MAJ2, MAJ3, P4, P5, MAJ6, MAJ7, P8];

impl Interval {
    /// Semitone offset from unison
    pub fn semitones(self) -> i8 {
        self.0
    }

    /// Shift this interval by a semitone offset.
    ///
    /// Returns `None` when the result falls outside the chromatic range
    /// covered by the pedal's effects.
    pub fn transposed(self, semitones: i8) -> Option<Interval> {
        let shifted = self.0 as i16 + semitones as i16;
        if (CHROMATIC_MIN as i16..=CHROMATIC_MAX as i16).contains(&shifted) {
            Some(Interval(shifted as i8))
        } else {
            None
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 >= 0 {
            write!(f, "+{}", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Resolves symbolic intervals to toe positions, per effect.
///
/// Each pitch effect maps its semitone range linearly onto toe 0-127. Unison
/// resolves to toe 0 in every pitch patch, so ascending and descending
/// phrases can cross the unison without a patch switch.
#[derive(Debug, Clone)]
pub struct IntervalMap {
    map: HashMap<Effect, HashMap<Interval, u8>>,
}

impl Default for IntervalMap {
    fn default() -> Self {
        Self::new()
    }
}

impl IntervalMap {
    /// Build the interval tables for the pedal's pitch patches.
    pub fn new() -> Self {
        let ranges: [(Effect, i8, i8); 5] = [
            (Effect::UP_TWO_OCTAVES, 0, 24),
            (Effect::UP_OCTAVE, 0, 12),
            (Effect::DOWN_OCTAVE, -12, 0),
            (Effect::DOWN_TWO_OCTAVES, -24, 0),
            (Effect::DIVE_BOMB, -36, 0),
        ];

        let mut map = HashMap::new();
        for (effect, low, high) in ranges {
            let span = (high as i16 - low as i16).unsigned_abs();
            let mut table = HashMap::new();
            for s in low..=high {
                let toe = (s.unsigned_abs() as f64 * 127.0 / span as f64).round() as u8;
                table.insert(Interval(s), toe.min(127));
            }
            map.insert(effect, table);
        }
        Self { map }
    }

    /// Resolve an interval to a toe position for the given effect.
    ///
    /// Returns `None` when the interval is outside the effect's range (or the
    /// effect has no interval table at all).
    pub fn resolve(&self, effect: Effect, interval: Interval) -> Option<u8> {
        self.map.get(&effect)?.get(&interval).copied()
    }
}
