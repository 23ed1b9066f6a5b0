//! Configuration for voice state acquisition

use std::time::Duration;

use rpc_client::{ClientOptions, Credentials};

use crate::error::{Result, VoiceError};

/// Configuration for the connection supervisor and the voice state source
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Application id presented during the IPC handshake
    pub client_id: String,

    /// How the session authenticates after the handshake
    /// Default: no authentication
    pub credentials: Credentials,

    /// Restrict endpoint discovery to one IPC slot
    /// Default: try every slot
    pub ipc_pipe: Option<u8>,

    /// Timeout for each RPC request, poll queries included
    /// Default: 5 seconds
    pub request_timeout: Duration,

    /// Timeout for the IPC handshake
    /// Default: 5 seconds
    pub handshake_timeout: Duration,

    /// Interval of the recurring voice state poll
    /// Default: 500 milliseconds
    pub poll_interval: Duration,

    /// Base delay for exponential reconnect backoff
    /// Default: 5 seconds
    pub reconnect_base_delay: Duration,

    /// Automatic reconnect attempts before giving up
    /// Default: 10
    pub max_reconnect_attempts: u32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            credentials: Credentials::None,
            ipc_pipe: None,
            request_timeout: Duration::from_secs(5),
            handshake_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(500),
            reconnect_base_delay: Duration::from_secs(5),
            max_reconnect_attempts: 10,
        }
    }
}

impl VoiceConfig {
    /// Create a config for the given application id with default values
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            ..Default::default()
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_ipc_pipe(mut self, pipe: Option<u8>) -> Self {
        self.ipc_pipe = pipe;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_reconnect_base_delay(mut self, delay: Duration) -> Self {
        self.reconnect_base_delay = delay;
        self
    }

    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Delay before automatic reconnect attempt number `attempt` (zero based)
    ///
    /// Saturates at `Duration::MAX` instead of overflowing.
    pub fn reconnect_delay(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|factor| self.reconnect_base_delay.checked_mul(factor))
            .unwrap_or(Duration::MAX)
    }

    /// Options for opening an RPC session with this config
    pub fn client_options(&self) -> ClientOptions {
        let mut options = ClientOptions::new(self.client_id.clone())
            .with_request_timeout(self.request_timeout)
            .with_pipe(self.ipc_pipe);
        options.handshake_timeout = self.handshake_timeout;
        options
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(VoiceError::Configuration(
                "Poll interval must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout.is_zero() || self.handshake_timeout.is_zero() {
            return Err(VoiceError::Configuration(
                "RPC timeouts must be greater than 0".to_string(),
            ));
        }

        if self.reconnect_base_delay.is_zero() {
            return Err(VoiceError::Configuration(
                "Reconnect base delay must be greater than 0".to_string(),
            ));
        }

        if let Some(pipe) = self.ipc_pipe {
            if pipe >= rpc_client::transport::PIPE_SLOTS {
                return Err(VoiceError::Configuration(format!(
                    "IPC pipe index must be below {}",
                    rpc_client::transport::PIPE_SLOTS
                )));
            }
        }

        Ok(())
    }
}
