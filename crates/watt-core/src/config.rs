//! Configuration for timing and output.
//!
//! Configuration is TOML, loaded from an explicit path given on the command
//! line; every field has a default so a missing file is not an error.
//!
//! The timing section carries one hard invariant: the lookahead window must
//! be at least twice the producer's poll sleep, in both device-present and
//! device-absent modes. A shorter window lets the program runner oversleep
//! its own buffer and starve the device of output. [`Config::validate`]
//! rejects such configurations before any thread starts.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default lookahead window with a physical device attached, in ms
pub const DEFAULT_BUFFER_WINDOW_MS: u64 = 200;

/// Default sleep increment of the runner's buffer-wait loop, in ms
pub const DEFAULT_POLL_SLEEP_MS: u64 = 100;

/// Default lookahead window in device-absent mode: no output latency needs
/// compensating, so only the starvation bound applies
pub const DEFAULT_NODEV_WINDOW_MS: u64 = 2 * DEFAULT_POLL_SLEEP_MS;

/// Default offset added to the watermark for live key commands, in ms
pub const DEFAULT_LIVE_OFFSET_MS: u64 = 10;

/// Default grace period for the final mute to flush out, in ms
pub const DEFAULT_FLUSH_GRACE_MS: u64 = 3000;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Timing configuration
    pub timing: TimingSettings,
    /// Output sink configuration
    pub output: OutputSettings,
}

/// Scheduling and shutdown timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    /// Lookahead window with a physical device, in ms
    pub buffer_window_ms: u64,
    /// Sleep increment for buffer-wait and shutdown polling, in ms
    pub poll_sleep_ms: u64,
    /// Lookahead window without a physical device, in ms
    pub nodev_window_ms: u64,
    /// Offset past the watermark for live key commands, in ms
    pub live_offset_ms: u64,
    /// Grace period after the final mute before releasing the sink, in ms
    pub flush_grace_ms: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            buffer_window_ms: DEFAULT_BUFFER_WINDOW_MS,
            poll_sleep_ms: DEFAULT_POLL_SLEEP_MS,
            nodev_window_ms: DEFAULT_NODEV_WINDOW_MS,
            live_offset_ms: DEFAULT_LIVE_OFFSET_MS,
            flush_grace_ms: DEFAULT_FLUSH_GRACE_MS,
        }
    }
}

/// Output sink settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// MIDI client name
    pub client_name: String,
    /// MIDI output port name
    pub port_name: String,
    /// Fallback file path for device-absent mode
    pub file_path: String,
    /// How early to hand messages to the MIDI driver, in ms
    pub latency_ms: u64,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            client_name: "watt".to_string(),
            port_name: "watt-out".to_string(),
            file_path: "./watt.out".to_string(),
            latency_ms: 0,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the timing invariants.
    pub fn validate(&self) -> Result<()> {
        let t = &self.timing;
        if t.poll_sleep_ms == 0 {
            return Err(Error::Config("poll_sleep_ms must be positive".to_string()));
        }
        if t.buffer_window_ms < 2 * t.poll_sleep_ms {
            return Err(Error::Config(format!(
                "buffer_window_ms ({}) must be at least twice poll_sleep_ms ({}) \
                 or the device can starve",
                t.buffer_window_ms, t.poll_sleep_ms
            )));
        }
        if t.nodev_window_ms < 2 * t.poll_sleep_ms {
            return Err(Error::Config(format!(
                "nodev_window_ms ({}) must be at least twice poll_sleep_ms ({}) \
                 or the device can starve",
                t.nodev_window_ms, t.poll_sleep_ms
            )));
        }
        Ok(())
    }

    /// The lookahead window to use for the given device presence.
    pub fn buffer_window_ms(&self, device_present: bool) -> u64 {
        if device_present {
            self.timing.buffer_window_ms
        } else {
            self.timing.nodev_window_ms
        }
    }
}
