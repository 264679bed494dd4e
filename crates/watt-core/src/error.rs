//! Error types for watt-core

use thiserror::Error;

/// Result type alias for watt-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in watt-core
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// MIDI backend initialization error
    #[error("MIDI init error: {0}")]
    MidiInit(#[from] midir::InitError),

    /// MIDI connection error
    #[error("MIDI connect error: {0}")]
    MidiConnect(String),

    /// MIDI send error
    #[error("MIDI send error: {0}")]
    MidiSend(#[from] midir::SendError),

    /// Requested program is not in the registry
    #[error("Program '{0}' not found")]
    UnknownProgram(String),

    /// Input source error
    #[error("Input error: {0}")]
    Input(String),

    /// The command queue has no remaining consumer
    #[error("Command queue closed")]
    QueueClosed,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}
