//! Error types for the RPC client

use thiserror::Error;

/// Error code the voice client returns for requests that need an authenticated session
pub const NOT_AUTHENTICATED: i64 = 4006;

/// Error code the voice client returns when a channel-scoped request has no channel
pub const INVALID_CHANNEL: i64 = 4005;

/// Errors that can occur while talking to the voice client
#[derive(Debug, Error)]
pub enum RpcError {
    /// Socket or pipe level failure
    #[error("IPC error: {0}")]
    Io(#[from] std::io::Error),

    /// The session was closed by either side
    #[error("RPC session closed{}", .0.as_ref().map(|r| format!(": {r}")).unwrap_or_default())]
    Closed(Option<String>),

    /// A frame violated the wire protocol
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// No reply arrived within the request timeout
    #[error("RPC request '{0}' timed out")]
    Timeout(String),

    /// The voice client answered with an `ERROR` event
    #[error("RPC error {code}: {message}")]
    Response {
        /// Numeric error code reported by the voice client
        code: i64,
        /// Human readable message reported by the voice client
        message: String,
    },

    /// The initial handshake did not complete
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// Authorization or token exchange failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// A payload could not be (de)serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RpcError {
    /// Whether this error means the underlying session is gone and must be re-established
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, RpcError::Io(_) | RpcError::Closed(_))
    }

    /// Whether this error describes a normal "nothing to report" condition
    ///
    /// Not being in a voice channel and not being authenticated are regular
    /// states of the voice client rather than faults.
    pub fn is_expected_absence(&self) -> bool {
        match self {
            RpcError::Response { code, message } => {
                let message = message.to_ascii_lowercase();
                *code == NOT_AUTHENTICATED
                    || *code == INVALID_CHANNEL
                    || message.contains("not authenticated")
                    || message.contains("not in a voice channel")
            }
            _ => false,
        }
    }
}

/// Result type for RPC operations
pub type Result<T> = std::result::Result<T, RpcError>;
