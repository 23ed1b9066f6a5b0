//! Error types for the lighting crate.

use light_api::DeviceError;

/// Errors delivering light commands or managing captures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LightingError {
    /// The target record is inconsistent, e.g. an inverted LED range
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// Every attempt failed and the device is now considered offline
    #[error("Device {address} unreachable after {attempts} attempts: {last_error}")]
    Unreachable {
        address: String,
        attempts: u32,
        last_error: DeviceError,
    },

    /// A single, non-retried device call failed
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// Restore was requested for a device that was never captured
    #[error("No captured state for device {0}")]
    NoSnapshot(String),

    /// Invalid configuration provided
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl LightingError {
    /// Whether the failure comes from the caller's configuration rather
    /// than from the device or network
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            LightingError::InvalidTarget(_)
                | LightingError::Configuration(_)
                | LightingError::Device(DeviceError::InvalidAddress(_))
        )
    }
}

/// Convenience type alias for Results using LightingError.
pub type Result<T> = std::result::Result<T, LightingError>;
