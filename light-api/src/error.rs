use thiserror::Error;

/// Errors talking to a single lighting device
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// The configured address cannot be turned into a device URL
    #[error("Invalid device address '{0}'")]
    InvalidAddress(String),

    /// Connection refused, DNS failure, reset and the like
    #[error("Network error: {0}")]
    Network(String),

    /// No response within the per-call timeout
    #[error("Request to {0} timed out")]
    Timeout(String),

    /// The device answered with a non-2xx status
    #[error("Device returned HTTP {0}")]
    Status(u16),

    /// The device answered with a body we could not understand
    #[error("Parse error: {0}")]
    Parse(String),
}

impl DeviceError {
    /// Whether retrying the same call might succeed
    ///
    /// Configuration problems and malformed replies are never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DeviceError::Network(_) | DeviceError::Timeout(_) | DeviceError::Status(_)
        )
    }
}

/// Result type for device operations
pub type Result<T> = std::result::Result<T, DeviceError>;
