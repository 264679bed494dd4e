//! Dispatcher: the command queue's sole consumer.
//!
//! The dispatcher selects over the command queue and a stop channel,
//! applies each command to the device state, and forwards the resulting
//! wire writes to the output sink in emission order. Shutdown enqueues one
//! final forced mute and only then signals the stop channel; since the
//! queue is FIFO, draining it after the stop signal is guaranteed to play
//! every remaining command, the mute last.

use crate::command::Command;
use crate::device::{DeviceState, Watermark};
use crate::intervals::IntervalMap;
use crate::output::OutputSink;
use crate::queue::{CommandReceiver, StopReceiver};
use crossbeam_channel::select;

/// Consumes commands and drives the output sink.
pub struct Dispatcher {
    cmd_rx: CommandReceiver,
    stop_rx: StopReceiver,
    state: DeviceState,
    intervals: IntervalMap,
    sink: Box<dyn OutputSink>,
}

impl Dispatcher {
    /// Create a dispatcher owning the device state and the sink.
    pub fn new(cmd_rx: CommandReceiver, sink: Box<dyn OutputSink>, stop_rx: StopReceiver) -> Self {
        Self {
            cmd_rx,
            stop_rx,
            state: DeviceState::new(),
            intervals: IntervalMap::new(),
            sink,
        }
    }

    /// Handle to the device-state watermark.
    pub fn watermark(&self) -> Watermark {
        self.state.watermark()
    }

    /// Run until the stop channel signals (or every producer is gone).
    /// Returns the sink so the shutdown coordinator can release it after
    /// the flush grace.
    pub fn run(mut self) -> Box<dyn OutputSink> {
        loop {
            select! {
                recv(self.cmd_rx) -> msg => match msg {
                    Ok(cmd) => self.process(&cmd),
                    Err(_) => break,
                },
                recv(self.stop_rx) -> _ => {
                    // The final mute was enqueued before this signal was
                    // sent, so the drain always reaches it.
                    let pending: Vec<Command> = self.cmd_rx.try_iter().collect();
                    for cmd in pending {
                        self.process(&cmd);
                    }
                    break;
                }
            }
        }
        log::debug!("dispatcher stopped");
        self.sink
    }

    fn process(&mut self, cmd: &Command) {
        let writes = self.state.apply(cmd, &self.intervals);
        for write in writes {
            if let Err(e) = self.sink.write(&write.bytes, write.timestamp) {
                log::error!("output sink write failed: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Command, Effect, Stomp};
    use crate::error::Result;
    use crate::intervals::MUTE;
    use crate::output::OutputSink;
    use crate::queue::{command_queue, stop_channel};
    use std::sync::{Arc, Mutex};

    /// Sink recording every write it receives.
    struct RecordingSink(Arc<Mutex<Vec<(Vec<u8>, u64)>>>);

    impl OutputSink for RecordingSink {
        fn write(&mut self, bytes: &[u8], timestamp: u64) -> Result<()> {
            self.0.lock().unwrap().push((bytes.to_vec(), timestamp));
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
    fn test_stop_signal_drains_queue_and_plays_mute_last() {
        let (cmd_tx, cmd_rx) = command_queue();
        let (stop_tx, stop_rx) = stop_channel();
        let written = Arc::new(Mutex::new(Vec::new()));
        let dispatcher =
            Dispatcher::new(cmd_rx, Box::new(RecordingSink(written.clone())), stop_rx);

        cmd_tx
            .send(Command::at(10).with_effect(Effect::UP_OCTAVE))
            .unwrap();
        // Mute before the stop signal: the dispatcher's drain must play it
        // even if the stop arm wins the select.
        cmd_tx
            .send(
                Command::at(20)
                    .with_effect(Effect::DIVE_BOMB)
                    .with_stomp(Stomp::Enabled)
                    .with_toe(MUTE)
                    .forced(),
            )
            .unwrap();
        stop_tx.send(()).unwrap();

        let _sink = std::thread::spawn(move || dispatcher.run()).join().unwrap();

        let written = written.lock().unwrap();
        // Program change, then mute's stomp + program change + toe
        assert_eq!(written.len(), 4);
        let last = written.last().unwrap();
        assert_eq!(last.0, vec![0xB0, 11, MUTE]);
        assert_eq!(last.1, 20);
    }

    #[test]
    fn test_redundant_commands_produce_no_writes() {
        let (cmd_tx, cmd_rx) = command_queue();
        let (_stop_tx, stop_rx) = stop_channel();
        let written = Arc::new(Mutex::new(Vec::new()));
        let dispatcher =
            Dispatcher::new(cmd_rx, Box::new(RecordingSink(written.clone())), stop_rx);

        cmd_tx.send(Command::at(10).with_toe(5u8)).unwrap();
        cmd_tx.send(Command::at(20).with_toe(5u8)).unwrap();
        drop(cmd_tx); // no producers left: dispatcher drains and exits

        dispatcher.run();
        assert_eq!(written.lock().unwrap().len(), 1);
    }
}
