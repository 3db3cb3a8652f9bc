//! # Error Types
//!
//! Custom error types for Maestro Drive using `thiserror`.

use thiserror::Error;

/// Main error type for Maestro Drive
#[derive(Debug, Error)]
pub enum DriveError {
    /// Configuration file could not be parsed
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration parsed but failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Channel calibration is not strictly ordered
    #[error("Invalid calibration: expected min < center < max, got {min}/{center}/{max}")]
    InvalidCalibration { min: u16, center: u16, max: u16 },

    /// Motor direction must be +1 or -1
    #[error("Invalid direction {0}: must be 1 or -1")]
    InvalidDirection(i64),

    /// Two devices claim the same hardware channel
    #[error("Channel {0} is assigned more than once")]
    DuplicateChannel(u8),

    /// Channel number beyond what the controller supports
    #[error("Channel {0} is out of range")]
    ChannelOutOfRange(u8),

    /// Command issued to a channel after it was closed
    #[error("Channel {0} is closed")]
    ChannelClosed(u8),

    /// Gamepad errors
    #[error("Controller error: {0}")]
    Controller(String),

    /// No gamepad could be found
    #[error("No gamepad found")]
    ControllerNotFound,

    /// The input reader stopped publishing controller state
    #[error("Controller input source closed")]
    InputClosed,

    /// Serial communication errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// No Maestro serial port could be opened
    #[error("No Maestro serial port found (tried: {0})")]
    SerialPortNotFound(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Maestro Drive
pub type Result<T> = std::result::Result<T, DriveError>;
