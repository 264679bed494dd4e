//! watt-core - scheduling and device-state engine for the watt sequencer.
//!
//! watt drives a pitch-shifting pedal (a DigiTech Whammy) over MIDI by
//! emitting precisely timestamped control messages for three pieces of
//! device state: the stomp (bypass/enable) switch, the active effect patch,
//! and the toe (expression pedal) position.
//!
//! The engine is built from small, separately testable pieces:
//!
//! - [`timebase`] - musical time to absolute device time
//! - [`device`] - tracked pedal state and redundant-write filtering
//! - [`queue`] - the FIFO command queue and the tempo-nudge channel
//! - [`runner`] - lookahead expansion of programs into commands
//! - [`input`] - key events to commands and control tokens
//! - [`dispatcher`] - the queue's sole consumer, feeding the output sink
//! - [`shutdown`] - deterministic teardown leaving the device silent
//!
//! Three execution contexts cooperate: the input router on the calling
//! thread, and the runner and dispatcher on background threads. Cancellation
//! is cooperative throughout; the dispatcher selects between the queue and a
//! stop channel, and shutdown enqueues a final forced mute ahead of the stop
//! signal so the post-signal drain always leaves the pedal silent.

pub mod command;
pub mod config;
pub mod device;
pub mod dispatcher;
pub mod error;
pub mod input;
pub mod intervals;
pub mod output;
pub mod program;
pub mod queue;
pub mod runner;
pub mod shutdown;
pub mod sustain;
pub mod timebase;
pub mod wire;

// Re-export main types
pub use command::{Command, Effect, Stomp, ToeValue};
pub use config::Config;
pub use device::{DeviceState, Watermark, WireWrite};
pub use dispatcher::Dispatcher;
pub use error::{Error, Result};
pub use input::{InputRouter, KeySource};
pub use intervals::{Interval, IntervalMap, MUTE};
pub use output::{open_sink, DeviceClock, FileSink, MidiPortSink, OutputSink};
pub use program::{Program, ProgramCtor, ProgramEvent, ProgramRegistry};
pub use queue::{command_queue, nudge_channel, stop_channel, TempoNudge};
pub use runner::ProgramRunner;
pub use shutdown::{mute_command, ShutdownCoordinator};
pub use sustain::SustainWatch;
pub use timebase::beat_to_timestamp;
