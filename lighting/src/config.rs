//! Configuration for light delivery

use std::time::Duration;

use crate::error::{LightingError, Result};

/// Timeouts and retry policy for device calls
#[derive(Debug, Clone)]
pub struct LightingConfig {
    /// Timeout for each device call
    /// Default: 5 seconds
    pub request_timeout: Duration,

    /// Attempts per delivery, the first one included
    /// Default: 3
    pub max_attempts: u32,

    /// Linear backoff step: attempt `n` is followed by `n * retry_base_delay`
    /// Default: 500 milliseconds
    pub retry_base_delay: Duration,

    /// Timeout for reachability probes, which are never retried
    /// Default: 3 seconds
    pub probe_timeout: Duration,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
            max_attempts: 3,
            retry_base_delay: Duration::from_millis(500),
            probe_timeout: Duration::from_secs(3),
        }
    }
}

impl LightingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Delay after failed attempt number `attempt` (one based)
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        self.retry_base_delay.saturating_mul(attempt)
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(LightingError::Configuration(
                "Max attempts must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout.is_zero() || self.probe_timeout.is_zero() {
            return Err(LightingError::Configuration(
                "Device timeouts must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
