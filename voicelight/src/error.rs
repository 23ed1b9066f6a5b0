use lighting::LightingError;
use voice_state::VoiceError;

use crate::logging::LoggingError;

/// Top-level error type
#[derive(Debug, thiserror::Error)]
pub enum VoiceLightError {
    #[error(transparent)]
    Voice(#[from] VoiceError),

    #[error(transparent)]
    Lighting(#[from] LightingError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    /// Invalid configuration provided
    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, VoiceLightError>;
