//! JSON settings file for the `run` command

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use lighting::{Device, LightingConfig, Zone};
use serde::Deserialize;
use voice_state::{Credentials, VoiceConfig};
use voicelight::VoiceLightConfig;

/// Settings as stored on disk
///
/// Durations are given in milliseconds; anything left out keeps the
/// library default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub client_id: String,
    pub access_token: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub ipc_pipe: Option<u8>,

    pub poll_interval_ms: Option<u64>,
    pub rpc_timeout_ms: Option<u64>,
    pub reconnect_base_delay_ms: Option<u64>,
    pub max_reconnect_attempts: Option<u32>,

    pub device_timeout_ms: Option<u64>,
    pub max_attempts: Option<u32>,
    pub retry_base_delay_ms: Option<u64>,

    pub capture_on_start: Option<bool>,
    pub restore_on_shutdown: Option<bool>,

    pub devices: Vec<Device>,
    pub zones: Vec<Zone>,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("Invalid settings file {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    fn credentials(&self) -> Result<Credentials> {
        match (&self.access_token, &self.client_secret) {
            (Some(_), Some(_)) => bail!("Set either access_token or client_secret, not both"),
            (Some(token), None) => Ok(Credentials::AccessToken(token.clone())),
            (None, Some(secret)) => Ok(Credentials::ClientSecret {
                secret: secret.clone(),
                redirect_uri: self.redirect_uri.clone(),
            }),
            (None, None) => Ok(Credentials::None),
        }
    }

    /// Build the runtime configuration, validated
    pub fn to_config(&self) -> Result<VoiceLightConfig> {
        if self.client_id.trim().is_empty() {
            bail!("client_id is required");
        }

        let mut voice = VoiceConfig::new(self.client_id.trim())
            .with_credentials(self.credentials()?)
            .with_ipc_pipe(self.ipc_pipe);
        if let Some(ms) = self.poll_interval_ms {
            voice = voice.with_poll_interval(Duration::from_millis(ms));
        }
        if let Some(ms) = self.rpc_timeout_ms {
            voice = voice.with_request_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = self.reconnect_base_delay_ms {
            voice = voice.with_reconnect_base_delay(Duration::from_millis(ms));
        }
        if let Some(attempts) = self.max_reconnect_attempts {
            voice = voice.with_max_reconnect_attempts(attempts);
        }

        let mut lighting = LightingConfig::new();
        if let Some(ms) = self.device_timeout_ms {
            lighting = lighting.with_request_timeout(Duration::from_millis(ms));
        }
        if let Some(attempts) = self.max_attempts {
            lighting = lighting.with_max_attempts(attempts);
        }
        if let Some(ms) = self.retry_base_delay_ms {
            lighting = lighting.with_retry_base_delay(Duration::from_millis(ms));
        }

        let config = VoiceLightConfig::new(voice)
            .with_lighting(lighting)
            .with_capture(
                self.capture_on_start.unwrap_or(true),
                self.restore_on_shutdown.unwrap_or(true),
            );
        config.validate()?;
        Ok(config)
    }
}
