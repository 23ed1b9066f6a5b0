//! Error types for the voice-state crate.

use rpc_client::RpcError;

/// Errors surfaced by voice state acquisition and supervision
#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    /// Invalid configuration provided
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The RPC session failed
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    /// The supervisor task is no longer running
    #[error("Connection supervisor has stopped")]
    SupervisorStopped,
}

/// Convenience type alias for Results using VoiceError.
pub type Result<T> = std::result::Result<T, VoiceError>;
