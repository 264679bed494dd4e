//! Program runner: expands programs into absolute-time commands.
//!
//! The runner works in whole-cycle lookahead steps. It keeps a `consumed_time`
//! cursor of device time already covered by enqueued commands; whenever the
//! cursor gets further than one buffer window ahead of the device clock it
//! sleeps in fixed increments, checking the cancellation flag between sleeps.
//! Each iteration drains pending tempo nudges, expands every event of the
//! program through the timebase offset by the cursor, enqueues the whole
//! cycle as one batch, and advances the cursor by the cycle duration at the
//! (possibly nudged) tempo.
//!
//! Enqueueing a full cycle at once is a known responsiveness limitation:
//! tempo nudges and shutdown only take effect at cycle granularity. Per-beat
//! enqueueing would be more responsive.

use crate::program::Program;
use crate::output::DeviceClock;
use crate::queue::{CommandSender, NudgeReceiver, TempoNudge};
use crate::timebase::beat_to_timestamp;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Lowest tempo a nudge can reach, in bpm
pub const MIN_BPM: u32 = 10;

/// Tempo step applied per nudge token, in bpm
pub const BPM_STEP: u32 = 10;

/// Runs one program for a fixed (or infinite) number of cycles.
pub struct ProgramRunner {
    program: Program,
    /// Remaining cycles; -1 plays forever
    count: i64,
    clock: DeviceClock,
    buffer_window_ms: u64,
    poll_sleep_ms: u64,
    cmd_tx: CommandSender,
    nudge_rx: NudgeReceiver,
    cancel: Arc<AtomicBool>,
}

impl ProgramRunner {
    /// Create a runner.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        program: Program,
        count: i64,
        clock: DeviceClock,
        buffer_window_ms: u64,
        poll_sleep_ms: u64,
        cmd_tx: CommandSender,
        nudge_rx: NudgeReceiver,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self {
            program,
            count,
            clock,
            buffer_window_ms,
            poll_sleep_ms,
            cmd_tx,
            nudge_rx,
            cancel,
        }
    }

    /// Run until the cycle count is exhausted, the cancellation flag is
    /// raised, or the command queue loses its consumer.
    pub fn run(mut self) {
        log::info!(
            "running program '{}' ({} cycles)",
            self.program.name,
            if self.count < 0 { "infinite".to_string() } else { self.count.to_string() }
        );

        // Leave one window of slack so initialization can finish before the
        // first commands come due.
        let mut consumed_time = self.clock.now_ms() + self.buffer_window_ms;
        let mut remaining = self.count;

        while remaining != 0 {
            // Sleep while the buffer is full, staying responsive to cancel
            while consumed_time > self.clock.now_ms() + self.buffer_window_ms {
                thread::sleep(Duration::from_millis(self.poll_sleep_ms));
                if self.cancel.load(Ordering::Relaxed) {
                    return;
                }
            }
            if self.cancel.load(Ordering::Relaxed) {
                return;
            }

            self.drain_nudges();

            if self.enqueue_cycle(consumed_time).is_err() {
                log::warn!("command queue closed, stopping program runner");
                return;
            }
            consumed_time += self.program.cycle_ms();

            if remaining > 0 {
                remaining -= 1;
            }
        }
        log::info!("program '{}' finished", self.program.name);
    }

    /// Apply all tempo nudges received since the last cycle.
    fn drain_nudges(&mut self) {
        for nudge in self.nudge_rx.try_iter() {
            let bpm = match nudge {
                TempoNudge::Up => self.program.bpm + BPM_STEP,
                TempoNudge::Down => self.program.bpm.saturating_sub(BPM_STEP).max(MIN_BPM),
            };
            log::info!("tempo {} -> {} bpm", self.program.bpm, bpm);
            self.program.bpm = bpm;
        }
    }

    /// Expand one full cycle starting at `start` and enqueue it as a batch.
    fn enqueue_cycle(&self, start: u64) -> Result<(), crossbeam_channel::SendError<crate::command::Command>> {
        let mut current_bar = None;
        for event in &self.program.events {
            if current_bar != Some(event.bar) {
                log::debug!("start of bar {}", event.bar);
                current_bar = Some(event.bar);
            }
            let offset = beat_to_timestamp(
                self.program.bpm,
                self.program.beats_per_measure,
                event.bar,
                event.beat,
            );
            let cmd = event.to_command(start + offset);
            if cmd.is_empty() {
                continue;
            }
            self.cmd_tx.send(cmd)?;
        }
        Ok(())
    }
}
