//! Timestamped device commands.
//!
//! A [`Command`] describes a target state for the pedal at an absolute device
//! time: an optional effect patch, an optional stomp state, and an optional
//! toe position. At least one of the three must be present. The `force` flag
//! bypasses redundant-write filtering in
//! [`DeviceState`](crate::device::DeviceState).

use crate::intervals::Interval;
use std::fmt;

/// A pitch effect patch, encoded as a 7-bit MIDI program number.
///
/// Patches 0-15 select an effect with the pedal engaged; adding 16 selects
/// the same effect bypassed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Effect(u8);

impl Effect {
    /// Two octaves up
    pub const UP_TWO_OCTAVES: Effect = Effect(0);
    /// One octave up
    pub const UP_OCTAVE: Effect = Effect(1);
    /// One octave down
    pub const DOWN_OCTAVE: Effect = Effect(2);
    /// Two octaves down
    pub const DOWN_TWO_OCTAVES: Effect = Effect(3);
    /// Dive bomb (three octaves down)
    pub const DIVE_BOMB: Effect = Effect(4);

    /// Create an effect from a raw patch number (masked to 7 bits).
    pub fn new(patch: u8) -> Self {
        Self(patch & 0x7F)
    }

    /// The raw program number of this effect.
    pub fn patch(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Effect::UP_TWO_OCTAVES => write!(f, "up2Octaves"),
            Effect::UP_OCTAVE => write!(f, "upOctave"),
            Effect::DOWN_OCTAVE => write!(f, "downOctave"),
            Effect::DOWN_TWO_OCTAVES => write!(f, "down2Octaves"),
            Effect::DIVE_BOMB => write!(f, "diveBomb"),
            Effect(patch) => write!(f, "patch{}", patch),
        }
    }
}

/// The pedal's bypass/enable switch state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stomp {
    /// Effect engaged
    Enabled,
    /// Effect bypassed
    Bypassed,
}

impl Stomp {
    /// Controller value carried on the stomp control change.
    pub fn wire_value(self) -> u8 {
        match self {
            Stomp::Enabled => 127,
            Stomp::Bypassed => 0,
        }
    }
}

/// A toe (expression pedal) target: either a concrete position or a symbolic
/// interval to be resolved against the active effect's interval table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToeValue {
    /// Concrete pedal position, 0-127
    Position(u8),
    /// Symbolic interval, resolved via [`IntervalMap`](crate::intervals::IntervalMap)
    Interval(Interval),
}

impl From<u8> for ToeValue {
    fn from(value: u8) -> Self {
        ToeValue::Position(value & 0x7F)
    }
}

impl From<Interval> for ToeValue {
    fn from(interval: Interval) -> Self {
        ToeValue::Interval(interval)
    }
}

/// A timestamped device command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Command {
    /// Effect patch to select
    pub effect: Option<Effect>,
    /// Stomp state to set
    pub stomp: Option<Stomp>,
    /// Toe position to reach
    pub toe: Option<ToeValue>,
    /// Absolute device time in milliseconds
    pub timestamp: u64,
    /// Write every carried attribute even if it matches tracked state
    pub force: bool,
}

impl Command {
    /// Create an empty command at the given timestamp.
    ///
    /// Attach at least one attribute with the `with_*` builders before
    /// enqueueing; attribute-less commands are dropped by producers.
    pub fn at(timestamp: u64) -> Self {
        Self {
            effect: None,
            stomp: None,
            toe: None,
            timestamp,
            force: false,
        }
    }

    /// Set the effect patch.
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effect = Some(effect);
        self
    }

    /// Set the stomp state.
    pub fn with_stomp(mut self, stomp: Stomp) -> Self {
        self.stomp = Some(stomp);
        self
    }

    /// Set the toe target.
    pub fn with_toe(mut self, toe: impl Into<ToeValue>) -> Self {
        self.toe = Some(toe.into());
        self
    }

    /// Mark the command as forced.
    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }

    /// True when the command carries no attribute at all.
    pub fn is_empty(&self) -> bool {
        self.effect.is_none() && self.stomp.is_none() && self.toe.is_none()
    }
}
