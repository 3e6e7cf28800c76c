//! # Error Types
//!
//! Custom error types for Cortex Link using `thiserror`.
//!
//! Only link and programming failures are errors. Protocol anomalies
//! (start-marker desync, sequence mismatch, unknown message type) are
//! absorbed by the session and never surface here.

use std::time::Duration;
use thiserror::Error;

/// Main error type for Cortex Link
#[derive(Debug, Error)]
pub enum CortexError {
    /// Read/write failure or stream closure on the cortex link
    #[error("Link I/O error: {0}")]
    LinkIo(std::io::Error),

    /// Local file I/O (configuration, telemetry)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No complete frame arrived within the configured read timeout
    #[error("Link timed out after {0:?} waiting for a frame")]
    LinkTimeout(Duration),

    /// Serial port could not be opened or configured
    #[error("Serial port error: {0}")]
    Serial(String),

    /// Inertial sensor driver failure
    #[error("Inertial sensor error: {0}")]
    Sensor(String),

    /// An inertial sample was requested before calibration ran
    #[error("Inertial sample requested before calibration")]
    CalibrationIncomplete,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Malformed outbound command line
    #[error("Invalid command: {0}")]
    Command(String),
}

impl CortexError {
    /// Whether the session can keep polling after this error.
    ///
    /// Only a read timeout is recoverable; everything else means the link or
    /// the program is broken.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CortexError::LinkTimeout(_))
    }
}

/// Result type alias for Cortex Link
pub type Result<T> = std::result::Result<T, CortexError>;
