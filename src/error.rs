//! Error types for control board operations.

use thiserror::Error;

use crate::framer::FrameError;
use crate::types::Key;

/// Result type alias for control board operations.
pub type Result<T> = std::result::Result<T, AcError>;

/// Error types for control board communication and control.
#[derive(Error, Debug)]
pub enum AcError {
    /// Serial port communication error
    #[error("Serial port error: {0}")]
    SerialPort(#[from] serialport::Error),

    /// General I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame could not be built or decoded
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    /// Value outside the range the board accepts for this key
    #[error("Invalid value for {key}: {value}")]
    InvalidValue {
        /// Key being written
        key: Key,
        /// Rejected value
        value: u16,
    },

    /// Key name not recognised
    #[error("Unknown key: {0}")]
    UnknownKey(String),

    /// Key exists but cannot be written
    #[error("Key is not settable: {0}")]
    NotSettable(Key),

    /// Requested set temperature outside both supported bands
    #[error("Temperature out of range: {0} (expected 16-30 or 63-86)")]
    TemperatureOutOfRange(u16),

    /// A temperature change is already being confirmed
    #[error("Temperature change already in progress (target {target})")]
    ActuationBusy {
        /// Target of the sequence in progress
        target: u16,
    },

    /// Infrared transmitter failure
    #[error("Infrared error: {0}")]
    Infrared(String),

    /// No serial port named in the configuration
    #[error("No serial port configured")]
    NoPort,

    /// Configuration could not be parsed
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// Data parsing error
    #[error("Parse error: {0}")]
    Parse(String),
}
