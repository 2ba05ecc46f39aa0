//! Custom error types for Aquacomputer D5 Next devices.
//!
//! This module provides fine-grained error handling for feature-report
//! exchanges, report decoding, and argument validation.

use thiserror::Error;

/// Main error type for D5 Next operations.
#[derive(Error, Debug)]
pub enum D5NextError {
    /// Device not found during enumeration.
    #[error("D5 Next not found. Check USB connection and permissions.")]
    DeviceNotFound,

    /// HID API error while enumerating or opening the device.
    #[error("HID communication error: {0}")]
    HidError(#[from] hidapi::HidError),

    /// A feature-report exchange failed or returned no data.
    #[error("Transport error on report {report_id:#04x}: {message}")]
    Transport { report_id: u8, message: String },

    /// No fresh data is available for a read.
    #[error("No data available")]
    NoData,

    /// Invalid or malformed report from the device.
    #[error("Invalid response from device: {message}")]
    InvalidResponse { message: String },

    /// Channel, index or value outside its valid range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Sensor type / attribute combination that is not modeled.
    #[error("Unsupported attribute {attribute} for {sensor}")]
    Unsupported {
        sensor: &'static str,
        attribute: &'static str,
    },

    /// Settings file could not be read or written.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl D5NextError {
    /// Whether this error came from the transport layer.
    pub fn is_transport(&self) -> bool {
        matches!(self, D5NextError::Transport { .. } | D5NextError::HidError(_))
    }
}

/// Result type alias for D5 Next operations.
pub type Result<T> = std::result::Result<T, D5NextError>;
