//! Pre-authored programs and the program registry.
//!
//! A [`Program`] is a named sequence of musical-time events at a fixed tempo.
//! Events are eagerly materialized into an ordered vector; programs are small
//! enough that lazy generation would add nothing but restartability hazards.
//!
//! Programs are registered in an explicit name-to-constructor table built by
//! the loader at startup - there is no runtime discovery of program types.

use crate::command::{Command, Effect, Stomp, ToeValue};
use crate::error::{Error, Result};
use crate::timebase::beat_to_timestamp;
use std::collections::BTreeMap;

/// A single musical-time event within a program.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgramEvent {
    /// Zero-based measure index
    pub bar: u32,
    /// Beat offset within the measure; may be fractional
    pub beat: f64,
    /// Effect patch to select
    pub effect: Option<Effect>,
    /// Stomp state to set
    pub stomp: Option<Stomp>,
    /// Toe target
    pub toe: Option<ToeValue>,
}

impl ProgramEvent {
    /// Create an event at the given musical position.
    pub fn new(bar: u32, beat: f64) -> Self {
        Self {
            bar,
            beat,
            effect: None,
            stomp: None,
            toe: None,
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

    /// Expand this event into a command at an absolute timestamp.
    pub fn to_command(&self, timestamp: u64) -> Command {
        Command {
            effect: self.effect,
            stomp: self.stomp,
            toe: self.toe,
            timestamp,
            force: false,
        }
    }
}

/// A named sequence of events at a fixed tempo.
///
/// Immutable once built, except for `bpm`, which the program runner adjusts
/// from live tempo nudges.
#[derive(Debug, Clone)]
pub struct Program {
    /// Program name, as listed and selected on the command line
    pub name: String,
    /// Tempo in beats per minute; always positive
    pub bpm: u32,
    /// Beats per measure
    pub beats_per_measure: u32,
    /// Number of measures in one cycle
    pub measures: u32,
    /// Ordered events
    pub events: Vec<ProgramEvent>,
}

impl Program {
    /// Create an empty program.
    pub fn new(name: impl Into<String>, bpm: u32, beats_per_measure: u32, measures: u32) -> Self {
        Self {
            name: name.into(),
            bpm,
            beats_per_measure,
            measures,
            events: Vec::new(),
        }
    }

    /// Add an event.
    pub fn with_event(mut self, event: ProgramEvent) -> Self {
        self.events.push(event);
        self
    }

    /// Duration of one full cycle in milliseconds at the current tempo.
    pub fn cycle_ms(&self) -> u64 {
        beat_to_timestamp(self.bpm, self.beats_per_measure, self.measures, 0.0)
    }
}

/// Constructor for a registered program.
pub type ProgramCtor = fn() -> Program;

/// Explicit name-to-constructor table of runnable programs.
#[derive(Debug, Default)]
pub struct ProgramRegistry {
    ctors: BTreeMap<String, ProgramCtor>,
}

impl ProgramRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a program constructor under a name.
    pub fn register(&mut self, name: impl Into<String>, ctor: ProgramCtor) {
        self.ctors.insert(name.into(), ctor);
    }

    /// Names of all registered programs, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.ctors.keys().map(String::as_str).collect()
    }

    /// Build a fresh instance of the named program.
    pub fn build(&self, name: &str) -> Option<Program> {
        self.ctors.get(name).map(|ctor| ctor())
    }

    /// Build the named program, failing when it is not registered.
    pub fn get(&self, name: &str) -> Result<Program> {
        self.build(name)
            .ok_or_else(|| Error::UnknownProgram(name.to_string()))
    }
}
