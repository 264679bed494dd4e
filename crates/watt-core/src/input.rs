//! Input router: turns key presses into commands and control tokens.
//!
//! One key is read per iteration from an abstract, blocking [`KeySource`].
//! Recognized keys fall into four categories:
//!
//! - tempo nudges (`-`/`_` down, `=`/`+` up), forwarded to the runner's
//!   control channel
//! - transpose changes (`[`/`]` step by a semitone, `1`-`5` jump to fixed
//!   offsets), affecting subsequent pitch lookups only
//! - mapped pitch keys, resolved immediately to a command scheduled just
//!   past the watermark
//! - a terminator: any key outside the recognized alphabet ends the router,
//!   and with it the whole run
//!
//! Read errors are deliberately converted into the same termination as an
//! exit key: a broken input loop must still leave the shutdown sequence in
//! charge of the terminal and the device.

use crate::command::{Command, Effect};
use crate::device::Watermark;
use crate::error::Result;
use crate::intervals::{self, Interval};
use crate::queue::{CommandSender, NudgeSender, TempoNudge};

/// Lowest transpose offset in semitones
pub const TRANSPOSE_MIN: i8 = -36;

/// Highest transpose offset in semitones
pub const TRANSPOSE_MAX: i8 = 24;

/// A blocking single-key input source.
pub trait KeySource {
    /// Read one key, blocking until it arrives.
    fn read_key(&mut self) -> Result<char>;
}

/// Map a keyboard key to its pitch interval.
///
/// The home row walks up the white-note intervals, the row above carries the
/// chromatic steps between them.
fn key_interval(key: char) -> Option<Interval> {
    Some(match key {
        'a' => intervals::P1,
        'w' => intervals::MIN2,
        's' => intervals::MAJ2,
        'e' => intervals::MIN3,
        'd' => intervals::MAJ3,
        'f' => intervals::P4,
        't' => intervals::AUG4,
        'g' => intervals::P5,
        'y' => intervals::MIN6,
        'h' => intervals::MAJ6,
        'u' => intervals::MIN7,
        'j' => intervals::MAJ7,
        'k' => intervals::P8,
        'o' => intervals::MIN9,
        'l' => intervals::MAJ9,
        'p' => intervals::MIN10,
        ';' => intervals::MAJ10,
        '\'' => intervals::P11,
        _ => return None,
    })
}

/// Pick the patch that can play the given transposed interval.
///
/// Unison returns `None`: it plays accurately in any pitch patch, and not
/// reassigning the patch lets ascending and descending phrases cross the
/// unison without a program change.
fn effect_for(interval: Interval) -> Option<Effect> {
    let s = interval.semitones();
    if s > 0 {
        Some(Effect::UP_TWO_OCTAVES)
    } else if s < 0 {
        if s >= -24 {
            Some(Effect::DOWN_TWO_OCTAVES)
        } else {
            Some(Effect::DIVE_BOMB)
        }
    } else {
        None
    }
}

/// What the router decided after one key.
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

/// Routes key presses from a [`KeySource`] until a terminator arrives.
pub struct InputRouter<S: KeySource> {
    source: S,
    cmd_tx: CommandSender,
    nudge_tx: NudgeSender,
    watermark: Watermark,
    live_offset_ms: u64,
    /// Current transpose offset in semitones
    offset: i8,
}

impl<S: KeySource> InputRouter<S> {
    /// Create a router reading from `source`.
    pub fn new(
        source: S,
        cmd_tx: CommandSender,
        nudge_tx: NudgeSender,
        watermark: Watermark,
        live_offset_ms: u64,
    ) -> Self {
        Self {
            source,
            cmd_tx,
            nudge_tx,
            watermark,
            live_offset_ms,
            offset: 0,
        }
    }

    /// Run until a terminator key or an input error. Never panics or hangs
    /// on failure; both paths return normally so shutdown always follows.
    pub fn run(mut self) {
        loop {
            let key = match self.source.read_key() {
                Ok(key) => key,
                Err(e) => {
                    log::warn!("input source failed ({e}), shutting down");
                    return;
                }
            };
            if self.handle_key(key) == Flow::Exit {
                return;
            }
        }
    }

    fn handle_key(&mut self, key: char) -> Flow {
        match key {
            '-' | '_' => {
                let _ = self.nudge_tx.send(TempoNudge::Down);
            }
            '=' | '+' => {
                let _ = self.nudge_tx.send(TempoNudge::Up);
            }
            '[' => self.set_offset(self.offset.saturating_sub(1).max(TRANSPOSE_MIN)),
            ']' => self.set_offset(self.offset.saturating_add(1).min(TRANSPOSE_MAX)),
            '1' => self.set_offset(-36),
            '2' => self.set_offset(-24),
            '3' => self.set_offset(-12),
            '4' => self.set_offset(0),
            '5' => self.set_offset(12),
            // Useful in composition to break up a sequence with a return
            '\r' | '\n' => {}
            key => {
                if let Some(interval) = key_interval(key) {
                    return self.play(interval);
                }
                if !key.is_ascii_lowercase() {
                    log::info!("received key {key:?}: exiting");
                    return Flow::Exit;
                }
                // Unmapped letters are ignored so stray fingers on the home
                // rows do not kill a performance.
            }
        }
        Flow::Continue
    }

    fn set_offset(&mut self, offset: i8) {
        self.offset = offset;
        log::info!("key change to {offset}");
    }

    /// Resolve a pitch key through the transpose offset and enqueue the
    /// resulting command just past the watermark.
    fn play(&mut self, interval: Interval) -> Flow {
        let Some(out) = interval.transposed(self.offset) else {
            log::warn!(
                "interval {} transposed by {} leaves the pedal's range",
                interval,
                self.offset
            );
            return Flow::Continue;
        };

        let mut cmd = Command::at(self.watermark.get() + self.live_offset_ms).with_toe(out);
        if let Some(effect) = effect_for(out) {
            cmd = cmd.with_effect(effect);
        }
        if self.cmd_tx.send(cmd).is_err() {
            log::warn!("command queue closed, shutting down input");
            return Flow::Exit;
        }
        Flow::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ToeValue;
    use crate::error::Error;
    use crate::queue::{command_queue, nudge_channel};

    /// Key source replaying a fixed script, then failing.
    struct Script(Vec<char>);

    impl KeySource for Script {
        fn read_key(&mut self) -> Result<char> {
            if self.0.is_empty() {
                Err(Error::Input("script exhausted".to_string()))
            } else {
                Ok(self.0.remove(0))
            }
        }
    }

    fn router(keys: &str) -> (InputRouter<Script>, crate::queue::CommandReceiver, crate::queue::NudgeReceiver) {
        let (cmd_tx, cmd_rx) = command_queue();
        let (nudge_tx, nudge_rx) = nudge_channel();
        let r = InputRouter::new(
            Script(keys.chars().collect()),
            cmd_tx,
            nudge_tx,
            Watermark::new(),
            10,
        );
        (r, cmd_rx, nudge_rx)
    }

    #[test]
    fn test_pitch_key_becomes_command() {
        let (r, cmd_rx, _nudge_rx) = router("k!");
        r.run();
        let commands: Vec<_> = cmd_rx.try_iter().collect();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].toe, Some(ToeValue::Interval(intervals::P8)));
        assert_eq!(commands[0].effect, Some(Effect::UP_TWO_OCTAVES));
        assert_eq!(commands[0].timestamp, 10); // watermark 0 + live offset
    }

    #[test]
    fn test_unison_keeps_current_patch() {
        let (r, cmd_rx, _nudge_rx) = router("a!");
        r.run();
        let commands: Vec<_> = cmd_rx.try_iter().collect();
        assert_eq!(commands[0].effect, None);
    }

    #[test]
    fn test_transpose_affects_later_keys_only() {
        // P1 untransposed, then drop an octave and play P1 again
        let (r, cmd_rx, _nudge_rx) = router("a3a!");
        r.run();
        let commands: Vec<_> = cmd_rx.try_iter().collect();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].toe, Some(ToeValue::Interval(intervals::P1)));
        assert_eq!(commands[1].toe, Some(ToeValue::Interval(intervals::D_P8)));
        assert_eq!(commands[1].effect, Some(Effect::DOWN_TWO_OCTAVES));
    }

    #[test]
    fn test_deep_transpose_selects_dive_bomb() {
        let (r, cmd_rx, _nudge_rx) = router("1a!");
        r.run();
        let commands: Vec<_> = cmd_rx.try_iter().collect();
        assert_eq!(commands[0].toe, Some(ToeValue::Interval(intervals::D_P22)));
        assert_eq!(commands[0].effect, Some(Effect::DIVE_BOMB));
    }

    #[test]
    fn test_out_of_range_transpose_drops_key() {
        // +24 offset pushes P11 (17 semitones) past the pedal's range
        let (mut r, cmd_rx, _nudge_rx) = router("");
        for _ in 0..24 {
            r.handle_key(']');
        }
        assert_eq!(r.handle_key('\''), Flow::Continue);
        assert_eq!(cmd_rx.try_iter().count(), 0);
    }

    #[test]
    fn test_relative_transpose_clamps() {
        let (mut r, _cmd_rx, _nudge_rx) = router("");
        for _ in 0..100 {
            r.handle_key('[');
        }
        assert_eq!(r.offset, TRANSPOSE_MIN);
        for _ in 0..200 {
            r.handle_key(']');
        }
        assert_eq!(r.offset, TRANSPOSE_MAX);
    }

    #[test]
    fn test_tempo_keys_forward_nudges() {
        let (r, _cmd_rx, nudge_rx) = router("+-=_!");
        r.run();
        let nudges: Vec<_> = nudge_rx.try_iter().collect();
        assert_eq!(
            nudges,
            vec![TempoNudge::Up, TempoNudge::Down, TempoNudge::Up, TempoNudge::Down]
        );
    }

    #[test]
    fn test_unmapped_letter_is_ignored() {
        let (mut r, cmd_rx, _nudge_rx) = router("");
        assert_eq!(r.handle_key('z'), Flow::Continue);
        assert_eq!(r.handle_key('q'), Flow::Continue);
        assert_eq!(cmd_rx.try_iter().count(), 0);
    }

    #[test]
    fn test_non_alphabet_key_terminates() {
        let (mut r, _cmd_rx, _nudge_rx) = router("");
        assert_eq!(r.handle_key('!'), Flow::Exit);
        assert_eq!(r.handle_key('0'), Flow::Exit);
        assert_eq!(r.handle_key(' '), Flow::Exit);
    }

    #[test]
    fn test_read_error_terminates_cleanly() {
        let (r, cmd_rx, _nudge_rx) = router("");
        r.run(); // script exhausted immediately; must return, not panic
        assert_eq!(cmd_rx.try_iter().count(), 0);
    }
}
