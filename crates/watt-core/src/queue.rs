//! Channels connecting producers to the dispatcher and runner.
//!
//! The command queue is a FIFO with multiple producers (input router,
//! program runner) and a single consumer (dispatcher). It performs no
//! cross-producer timestamp re-sorting: each producer enqueues its own
//! commands in non-decreasing timestamp order, and interleaving between
//! producers is accepted as-is. Producer timestamps stay close to real time,
//! so adding a global sort here would buy nothing.
//!
//! The nudge channel carries live tempo adjustments from the input router to
//! the program runner (single producer, single consumer).

use crate::command::Command;
use crossbeam_channel::{unbounded, Receiver, Sender};

/// Producer end of the command queue.
pub type CommandSender = Sender<Command>;

/// Consumer end of the command queue.
pub type CommandReceiver = Receiver<Command>;

/// A live tempo adjustment token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempoNudge {
    /// Raise the tempo by 10 bpm
    Up,
    /// Lower the tempo by 10 bpm (floored at 10)
    Down,
}

/// Producer end of the tempo-nudge channel.
pub type NudgeSender = Sender<TempoNudge>;

/// Consumer end of the tempo-nudge channel.
pub type NudgeReceiver = Receiver<TempoNudge>;

/// Sender raising the dispatcher's stop signal.
pub type StopSender = Sender<()>;

/// Receiver the dispatcher selects on alongside the command queue.
pub type StopReceiver = Receiver<()>;

/// Create the command queue.
pub fn command_queue() -> (CommandSender, CommandReceiver) {
    unbounded()
}

/// Create the tempo-nudge control channel.
pub fn nudge_channel() -> (NudgeSender, NudgeReceiver) {
    unbounded()
}

/// Create the dispatcher stop channel.
pub fn stop_channel() -> (StopSender, StopReceiver) {
    unbounded()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order_preserved() {
        let (tx, rx) = command_queue();
        for ts in [10, 20, 30] {
            tx.send(Command::at(ts).with_toe(0u8)).unwrap();
        }
        let stamps: Vec<u64> = rx.try_iter().map(|c| c.timestamp).collect();
        assert_eq!(stamps, vec![10, 20, 30]);
    }

    #[test]
    fn test_multiple_producers_single_consumer() {
        let (tx, rx) = command_queue();
        let tx2 = tx.clone();
        std::thread::spawn(move || tx2.send(Command::at(1).with_toe(1u8)).unwrap())
            .join()
            .unwrap();
        tx.send(Command::at(2).with_toe(2u8)).unwrap();
        assert_eq!(rx.try_iter().count(), 2);
    }
}
