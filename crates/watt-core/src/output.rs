//! Output sinks and the device clock.
//!
//! The pedal is reached through an [`OutputSink`]: a timestamped byte writer
//! backed either by a real MIDI port (via midir) or, when no device is
//! present, by a plain log file. Device-absent mode also shortens the
//! producers' lookahead window, since there is no output latency to
//! compensate.
//!
//! All timing flows from a [`DeviceClock`] value handed explicitly to every
//! component that needs it; there is no ambient global clock.

use crate::config::OutputSettings;
use crate::error::{Error, Result};
use midir::{MidiOutput, MidiOutputConnection};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

/// Monotonic millisecond clock shared by every component.
///
/// Copies of a clock share the same epoch, so all components agree on "now".
#[derive(Debug, Clone, Copy)]
pub struct DeviceClock {
    epoch: Instant,
}

impl Default for DeviceClock {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceClock {
    /// Create a clock with its epoch at the current instant.
    pub fn new() -> Self {
        Self { epoch: Instant::now() }
    }

    /// Milliseconds elapsed since the clock's epoch.
    pub fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }
}

/// A timestamped byte sink standing in for the pedal.
pub trait OutputSink: Send {
    /// Deliver a message so that it takes effect at `timestamp` (device
    /// clock milliseconds). Implementations may block until the timestamp
    /// is due.
    fn write(&mut self, bytes: &[u8], timestamp: u64) -> Result<()>;

    /// True when a physical device is attached.
    fn device_present(&self) -> bool;

    /// Human-readable sink description for logs.
    fn name(&self) -> &str;
}

/// Sink backed by a real MIDI output port.
///
/// midir sends immediately, so the sink holds each message until its
/// timestamp is due (minus a configured hand-off latency) before writing.
pub struct MidiPortSink {
    conn: MidiOutputConnection,
    clock: DeviceClock,
    latency_ms: u64,
    port_name: String,
}

impl MidiPortSink {
    /// Connect to the first available MIDI output port.
    ///
    /// Returns `Ok(None)` when no port exists (device-absent mode).
    pub fn open_first(clock: DeviceClock, settings: &OutputSettings) -> Result<Option<Self>> {
        let midi_out = MidiOutput::new(&settings.client_name)?;
        let ports = midi_out.ports();
        let Some(port) = ports.first() else {
            return Ok(None);
        };
        let port_name = midi_out
            .port_name(port)
            .unwrap_or_else(|_| "unknown".to_string());
        let conn = midi_out
            .connect(port, &settings.port_name)
            .map_err(|e| Error::MidiConnect(e.to_string()))?;
        log::info!("connected to MIDI output '{}'", port_name);
        Ok(Some(Self {
            conn,
            clock,
            latency_ms: settings.latency_ms,
            port_name,
        }))
    }
}

impl OutputSink for MidiPortSink {
    fn write(&mut self, bytes: &[u8], timestamp: u64) -> Result<()> {
        let due = timestamp.saturating_sub(self.latency_ms);
        let now = self.clock.now_ms();
        if due > now {
            thread::sleep(Duration::from_millis(due - now));
        }
        self.conn.send(bytes)?;
        log::debug!("[{}] {:02X?} {}", self.clock.now_ms(), bytes, timestamp);
        Ok(())
    }

    fn device_present(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        &self.port_name
    }
}

/// Fallback sink writing one line per message to a file.
pub struct FileSink {
    writer: BufWriter<File>,
    clock: DeviceClock,
    path: String,
}

impl FileSink {
    /// Create the output file, truncating any previous run's contents.
    pub fn create(clock: DeviceClock, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(writer, "starting watt output file")?;
        Ok(Self {
            writer,
            clock,
            path: path.display().to_string(),
        })
    }
}

impl OutputSink for FileSink {
    fn write(&mut self, bytes: &[u8], timestamp: u64) -> Result<()> {
        writeln!(self.writer, "{:02X?} {}", bytes, timestamp)?;
        self.writer.flush()?;
        log::debug!("[{}] {:02X?} {}", self.clock.now_ms(), bytes, timestamp);
        Ok(())
    }

    fn device_present(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        &self.path
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

/// Open the best available sink: a MIDI port if one exists, otherwise the
/// configured fallback file.
pub fn open_sink(clock: DeviceClock, settings: &OutputSettings) -> Result<Box<dyn OutputSink>> {
    match MidiPortSink::open_first(clock, settings) {
        Ok(Some(sink)) => Ok(Box::new(sink)),
        Ok(None) => {
            log::warn!(
                "no MIDI device detected, using file sink '{}'",
                settings.file_path
            );
            Ok(Box::new(FileSink::create(clock, &settings.file_path)?))
        }
        Err(e) => {
            log::warn!("MIDI backend unavailable ({e}), using file sink");
            Ok(Box::new(FileSink::create(clock, &settings.file_path)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_is_monotonic() {
        let clock = DeviceClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
    }

    #[test]
    fn test_clock_copies_share_epoch() {
        let clock = DeviceClock::new();
        let copy = clock;
        thread::sleep(Duration::from_millis(5));
        let diff = clock.now_ms().abs_diff(copy.now_ms());
        assert!(diff <= 1);
    }

    #[test]
    fn test_file_sink_records_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watt.out");
        let clock = DeviceClock::new();
        {
            let mut sink = FileSink::create(clock, &path).unwrap();
            assert!(!sink.device_present());
            sink.write(&[0xC0, 4], 100).unwrap();
            sink.write(&[0xB0, 11, 127], 110).unwrap();
        }
        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "starting watt output file");
        assert!(lines[1].ends_with(" 100"));
        assert!(lines[2].ends_with(" 110"));
    }
}
