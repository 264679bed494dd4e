//! Tracked pedal state and redundant-write filtering.
//!
//! [`DeviceState`] is the engine's belief about the hardware: the last stomp,
//! effect, and toe values written, all starting out unknown so the first real
//! write always goes through. It is owned exclusively by the dispatcher; the
//! only piece other components may observe is the [`Watermark`], the latest
//! timestamp among all writes applied so far.

use crate::command::{Command, Effect, Stomp, ToeValue};
use crate::intervals::IntervalMap;
use crate::wire;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A single encoded message bound for the output sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireWrite {
    /// Raw MIDI bytes
    pub bytes: Vec<u8>,
    /// Absolute device time in milliseconds
    pub timestamp: u64,
}

/// Shared, monotonically non-decreasing high-water timestamp.
///
/// Raised by the dispatcher as writes are applied; read by the input router
/// (to timestamp live commands) and the shutdown coordinator (to wait for
/// scheduled output to finish playing).
#[derive(Debug, Clone, Default)]
pub struct Watermark(Arc<AtomicU64>);

impl Watermark {
    /// Create a watermark at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value in milliseconds.
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    /// Raise the watermark to `timestamp` if it is later than the current
    /// value. Never decreases.
    pub fn raise(&self, timestamp: u64) {
        self.0.fetch_max(timestamp, Ordering::AcqRel);
    }
}

/// The engine's tracked view of the pedal.
#[derive(Debug)]
pub struct DeviceState {
    stomp: Option<Stomp>,
    effect: Option<Effect>,
    toe: Option<u8>,
    watermark: Watermark,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceState {
    /// Create a state with all attributes unknown and the watermark at zero.
    pub fn new() -> Self {
        Self {
            stomp: None,
            effect: None,
            toe: None,
            watermark: Watermark::new(),
        }
    }

    /// Get a shareable handle to the watermark.
    pub fn watermark(&self) -> Watermark {
        self.watermark.clone()
    }

    /// Apply a command, returning the wire writes it produces in emission
    /// order: stomp, then effect, then toe.
    ///
    /// An attribute is written only when its resolved value differs from the
    /// tracked value or the command is forced. A command carrying both an
    /// effect write and `stomp = Bypassed` folds into a single program change
    /// on the bypassed bank (`patch + 16`); the tracked stomp is updated as a
    /// side effect and no separate stomp message is emitted. Only patches
    /// 0-15 have a bypassed bank; for anything higher the stomp goes out as
    /// its own control change.
    ///
    /// Symbolic toe values resolve against the effect tracked before this
    /// command's own effect field is applied. A failed resolution is
    /// non-fatal: the previous toe value is kept and nothing is emitted.
    pub fn apply(&mut self, cmd: &Command, intervals: &IntervalMap) -> Vec<WireWrite> {
        let mut writes = Vec::new();
        let prior_effect = self.effect;
        let effect_write = cmd
            .effect
            .is_some_and(|e| Some(e) != self.effect || cmd.force);
        let fold_ok = cmd
            .effect
            .is_some_and(|e| e.patch() < wire::BYPASS_BANK_OFFSET);

        if let Some(stomp) = cmd.stomp {
            // The bypassed-bank program change covers the stomp when both
            // are present and the effect actually gets written.
            let folded = effect_write && fold_ok && stomp == Stomp::Bypassed;
            if !folded && (Some(stomp) != self.stomp || cmd.force) {
                self.stomp = Some(stomp);
                writes.push(WireWrite {
                    bytes: wire::control_change(wire::CC_STOMP, stomp.wire_value()),
                    timestamp: cmd.timestamp,
                });
            }
        }

        if let Some(effect) = cmd.effect {
            if effect_write {
                self.effect = Some(effect);
                let mut patch = effect.patch();
                if cmd.stomp == Some(Stomp::Bypassed) && fold_ok {
                    patch += wire::BYPASS_BANK_OFFSET;
                    self.stomp = Some(Stomp::Bypassed);
                }
                writes.push(WireWrite {
                    bytes: wire::program_change(patch),
                    timestamp: cmd.timestamp,
                });
            }
        }

        if let Some(toe) = cmd.toe {
            let resolved = match toe {
                ToeValue::Position(value) => Some(value & 0x7F),
                ToeValue::Interval(interval) => {
                    let value = prior_effect.and_then(|e| intervals.resolve(e, interval));
                    if value.is_none() {
                        log::warn!(
                            "interval {} not mapped for {}, keeping previous toe",
                            interval,
                            prior_effect.map_or_else(|| "<unknown>".into(), |e| e.to_string()),
                        );
                    }
                    value
                }
            };
            if let Some(value) = resolved {
                if Some(value) != self.toe || cmd.force {
                    self.toe = Some(value);
                    writes.push(WireWrite {
                        bytes: wire::control_change(wire::CC_TOE, value),
                        timestamp: cmd.timestamp,
                    });
                }
            }
        }

        for write in &writes {
            self.watermark.raise(write.timestamp);
        }
        writes
    }
}
