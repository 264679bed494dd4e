//! Sustain watchdog for live keyboard mode.
//!
//! Without a program running, a held pitch rings until the player moves on.
//! The watchdog watches the watermark: once the last scheduled command is
//! more than the sustain period stale, it schedules a mute at
//! `watermark + sustain`. The mute's own timestamp is remembered; a
//! watermark sitting at it means the pedal is already muted, so no further
//! mutes go out until a key raises the watermark again.

use crate::device::Watermark;
use crate::output::DeviceClock;
use crate::queue::CommandSender;
use crate::shutdown::mute_command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Mutes the pedal after a period of keyboard inactivity.
pub struct SustainWatch {
    cmd_tx: CommandSender,
    watermark: Watermark,
    clock: DeviceClock,
    cancel: Arc<AtomicBool>,
    sustain_ms: u64,
    /// Timestamp of the last mute this watchdog scheduled
    last_mute: Option<u64>,
}

impl SustainWatch {
    /// Create a watchdog with the given sustain period.
    pub fn new(
        cmd_tx: CommandSender,
        watermark: Watermark,
        clock: DeviceClock,
        cancel: Arc<AtomicBool>,
        sustain_ms: u64,
    ) -> Self {
        Self {
            cmd_tx,
            watermark,
            clock,
            cancel,
            sustain_ms,
            last_mute: None,
        }
    }

    /// Run until cancelled.
    pub fn run(mut self) {
        let poll = Duration::from_millis((self.sustain_ms / 10).max(1));
        while !self.cancel.load(Ordering::Relaxed) {
            self.tick();
            thread::sleep(poll);
        }
    }

    /// One staleness check.
    fn tick(&mut self) {
        let wm = self.watermark.get();
        // A watermark at the last mute's timestamp means the pedal is
        // already muted; one sustain period behind it means that mute is
        // still queued. Neither needs another.
        let due = wm + self.sustain_ms;
        if self.last_mute == Some(wm) || self.last_mute == Some(due) {
            return;
        }
        if due < self.clock.now_ms() {
            log::debug!("sustain expired, scheduling mute");
            if self.cmd_tx.send(mute_command(due)).is_err() {
                return;
            }
            self.last_mute = Some(due);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::command_queue;

    #[test]
    fn test_stale_watermark_triggers_single_mute() {
        let (cmd_tx, cmd_rx) = command_queue();
        let watermark = Watermark::new();
        let clock = DeviceClock::new();
        let mut watch = SustainWatch::new(
            cmd_tx,
            watermark.clone(),
            clock,
            Arc::new(AtomicBool::new(false)),
            5,
        );

        thread::sleep(Duration::from_millis(10));
        watch.tick();
        watch.tick();
        watch.tick();

        // Watermark 0 was stale, but only one mute goes out for it
        let commands: Vec<_> = cmd_rx.try_iter().collect();
        assert_eq!(commands.len(), 1);
        assert!(commands[0].force);
        assert_eq!(commands[0].timestamp, 5);
    }

    #[test]
    fn test_muted_device_is_not_muted_again() {
        let (cmd_tx, cmd_rx) = command_queue();
        let watermark = Watermark::new();
        let clock = DeviceClock::new();
        let mut watch = SustainWatch::new(
            cmd_tx,
            watermark.clone(),
            clock,
            Arc::new(AtomicBool::new(false)),
            5,
        );

        thread::sleep(Duration::from_millis(10));
        watch.tick();
        let mute = cmd_rx.try_iter().next().unwrap();

        // The dispatcher applies the mute, raising the watermark to its
        // timestamp. Going stale again must not re-mute a silent pedal.
        watermark.raise(mute.timestamp);
        thread::sleep(Duration::from_millis(10));
        watch.tick();
        watch.tick();
        assert_eq!(cmd_rx.try_iter().count(), 0);
    }

    #[test]
    fn test_fresh_watermark_does_not_mute() {
        let (cmd_tx, cmd_rx) = command_queue();
        let watermark = Watermark::new();
        let clock = DeviceClock::new();
        // Schedule well into the future
        watermark.raise(clock.now_ms() + 60_000);
        let mut watch = SustainWatch::new(
            cmd_tx,
            watermark,
            clock,
            Arc::new(AtomicBool::new(false)),
            5,
        );
        watch.tick();
        assert_eq!(cmd_rx.try_iter().count(), 0);
    }
}
