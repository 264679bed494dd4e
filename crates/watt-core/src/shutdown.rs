//! Shutdown coordinator: deterministic teardown leaving the device silent.
//!
//! Invoked when the input router exits. The sequence is strictly ordered,
//! each step a prerequisite for the next:
//!
//! 1. raise the program runner's cancellation flag
//! 2. wait until the watermark is at or behind the device clock, so every
//!    already-queued command has had time to actually play
//! 3. join the runner
//! 4. enqueue a forced mute just past the watermark, silencing the pedal
//!    regardless of tracked state
//! 5. signal the dispatcher's stop channel - the queue is FIFO, so the
//!    dispatcher's post-signal drain always reaches the mute
//! 6. join the dispatcher, recovering the output sink
//! 7. wait for the mute's timestamp to pass in real time, plus a flush
//!    grace, then release the sink

use crate::command::{Command, Effect, Stomp};
use crate::device::Watermark;
use crate::intervals::MUTE;
use crate::output::{DeviceClock, OutputSink};
use crate::queue::{CommandSender, StopSender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Offset past the watermark for the final mute, in ms
pub const MUTE_OFFSET_MS: u64 = 10;

/// Build the forced mute command: dive bomb engaged with the toe at full
/// travel, silencing the pedal regardless of tracked state.
pub fn mute_command(timestamp: u64) -> Command {
    Command::at(timestamp)
        .with_effect(Effect::DIVE_BOMB)
        .with_stomp(Stomp::Enabled)
        .with_toe(MUTE)
        .forced()
}

/// Orchestrates the teardown of the runner and dispatcher.
pub struct ShutdownCoordinator {
    runner_cancel: Arc<AtomicBool>,
    stop_tx: StopSender,
    runner: Option<JoinHandle<()>>,
    dispatcher: JoinHandle<Box<dyn OutputSink>>,
    cmd_tx: CommandSender,
    watermark: Watermark,
    clock: DeviceClock,
    poll_sleep_ms: u64,
    flush_grace_ms: u64,
}

impl ShutdownCoordinator {
    /// Collect the handles and signals the teardown needs.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        runner_cancel: Arc<AtomicBool>,
        stop_tx: StopSender,
        runner: Option<JoinHandle<()>>,
        dispatcher: JoinHandle<Box<dyn OutputSink>>,
        cmd_tx: CommandSender,
        watermark: Watermark,
        clock: DeviceClock,
        poll_sleep_ms: u64,
        flush_grace_ms: u64,
    ) -> Self {
        Self {
            runner_cancel,
            stop_tx,
            runner,
            dispatcher,
            cmd_tx,
            watermark,
            clock,
            poll_sleep_ms,
            flush_grace_ms,
        }
    }

    /// Run the full shutdown sequence and release the sink.
    pub fn shutdown(self) {
        log::info!("shutting down");
        let Self {
            runner_cancel,
            stop_tx,
            runner,
            dispatcher,
            cmd_tx,
            watermark,
            clock,
            poll_sleep_ms,
            flush_grace_ms,
        } = self;

        runner_cancel.store(true, Ordering::Release);

        // Let everything already scheduled play out, so the mute we enqueue
        // next becomes the last scheduled command.
        wait_for_watermark(&watermark, clock, poll_sleep_ms);
        if let Some(runner) = runner {
            if runner.join().is_err() {
                log::error!("program runner panicked");
            }
        }

        // The mute must be in the queue before the stop signal, or the
        // dispatcher's drain could miss it.
        let mute = mute_command(watermark.get() + MUTE_OFFSET_MS);
        if cmd_tx.send(mute).is_err() {
            log::error!("could not enqueue final mute: queue already closed");
        }
        let _ = stop_tx.send(());

        let sink = match dispatcher.join() {
            Ok(sink) => Some(sink),
            Err(_) => {
                log::error!("dispatcher panicked");
                None
            }
        };

        // The mute raised the watermark; wait for it to elapse in real time
        // and give the driver a moment to flush before dropping the sink.
        wait_for_watermark(&watermark, clock, poll_sleep_ms);
        thread::sleep(Duration::from_millis(flush_grace_ms));
        drop(sink);
        log::info!("device released");
    }
}

/// Poll until all scheduled output is behind the device clock.
fn wait_for_watermark(watermark: &Watermark, clock: DeviceClock, poll_sleep_ms: u64) {
    while watermark.get() > clock.now_ms() {
        thread::sleep(Duration::from_millis(poll_sleep_ms));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ToeValue;
    use crate::dispatcher::Dispatcher;
    use crate::error::Result;
    use crate::queue::{command_queue, stop_channel};
    use std::sync::Mutex;

    struct RecordingSink(Arc<Mutex<Vec<Vec<u8>>>>);

    impl OutputSink for RecordingSink {
        fn write(&mut self, bytes: &[u8], _timestamp: u64) -> Result<()> {
            self.0.lock().unwrap().push(bytes.to_vec());
            Ok(())
        }

        fn device_present(&self) -> bool {
            false
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    #[test]
    fn test_mute_command_shape() {
        let mute = mute_command(1234);
        assert_eq!(mute.effect, Some(Effect::DIVE_BOMB));
        assert_eq!(mute.stomp, Some(Stomp::Enabled));
        assert_eq!(mute.toe, Some(ToeValue::Position(MUTE)));
        assert!(mute.force);
        assert_eq!(mute.timestamp, 1234);
    }

    #[test]
    fn test_run_ends_with_forced_mute() {
        let (cmd_tx, cmd_rx) = command_queue();
        let (stop_tx, stop_rx) = stop_channel();
        let written = Arc::new(Mutex::new(Vec::new()));
        let dispatcher =
            Dispatcher::new(cmd_rx, Box::new(RecordingSink(written.clone())), stop_rx);
        let watermark = dispatcher.watermark();
        let handle = thread::spawn(move || dispatcher.run());

        cmd_tx
            .send(Command::at(1).with_effect(Effect::UP_OCTAVE))
            .unwrap();

        let coordinator = ShutdownCoordinator::new(
            Arc::new(AtomicBool::new(false)),
            stop_tx,
            None,
            handle,
            cmd_tx,
            watermark,
            DeviceClock::new(),
            1,
            0,
        );
        coordinator.shutdown();

        let written = written.lock().unwrap();
        // The toe-at-MUTE control change is the very last thing written
        assert_eq!(written.last().unwrap(), &vec![0xB0, 11, MUTE]);
        // And the mute's program change selected the dive-bomb patch
        assert!(written.iter().any(|b| b == &vec![0xC0, Effect::DIVE_BOMB.patch()]));
    }
}
