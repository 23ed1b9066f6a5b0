use lighting::LightingConfig;
use voice_state::VoiceConfig;

use crate::error::Result;

/// Configuration for a [`VoiceLight`](crate::VoiceLight) instance
#[derive(Debug, Clone)]
pub struct VoiceLightConfig {
    pub voice: VoiceConfig,
    pub lighting: LightingConfig,

    /// Snapshot every device before the first light command
    /// Default: true
    pub capture_on_start: bool,

    /// Replay the snapshots on shutdown
    /// Default: true
    pub restore_on_shutdown: bool,
}

impl Default for VoiceLightConfig {
    fn default() -> Self {
        Self::new(VoiceConfig::default())
    }
}

impl VoiceLightConfig {
    pub fn new(voice: VoiceConfig) -> Self {
        Self {
            voice,
            lighting: LightingConfig::default(),
            capture_on_start: true,
            restore_on_shutdown: true,
        }
    }

    pub fn with_lighting(mut self, lighting: LightingConfig) -> Self {
        self.lighting = lighting;
        self
    }

    pub fn with_capture(mut self, capture_on_start: bool, restore_on_shutdown: bool) -> Self {
        self.capture_on_start = capture_on_start;
        self.restore_on_shutdown = restore_on_shutdown;
        self
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<()> {
        self.voice.validate()?;
        self.lighting.validate()?;
        Ok(())
    }
}
