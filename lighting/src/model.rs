//! Lighting targets and per-state configuration records
//!
//! These records belong to an outer configuration store. The core receives
//! them by value or reference per operation and never mutates them.

use std::collections::HashMap;

use light_api::{Rgb, DEFAULT_EFFECT_LEVEL};
use serde::{Deserialize, Serialize};
use voice_state::EffectiveState;

use crate::error::{LightingError, Result};

/// Brightness used when a record does not set one
pub const DEFAULT_BRIGHTNESS: i32 = 128;

fn default_true() -> bool {
    true
}

fn default_brightness() -> i32 {
    DEFAULT_BRIGHTNESS
}

fn default_level() -> u8 {
    DEFAULT_EFFECT_LEVEL
}

/// Effect selection for a whole-device target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectConfig {
    /// Index into the device's effect list
    pub effect_id: u8,
    #[serde(default = "default_level")]
    pub speed: u8,
    #[serde(default = "default_level")]
    pub intensity: u8,
}

/// How a target looks in one effective state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateLightConfig {
    pub color: Rgb,
    /// Clamped into 0..=255 when encoded
    #[serde(default = "default_brightness")]
    pub brightness: i32,
    /// A disabled state leaves the target untouched
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub effect: Option<EffectConfig>,
}

impl StateLightConfig {
    pub fn new(color: Rgb, brightness: i32) -> Self {
        Self {
            color,
            brightness,
            enabled: true,
            effect: None,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn with_effect(mut self, effect: EffectConfig) -> Self {
        self.effect = Some(effect);
        self
    }
}

/// A lighting device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// `host`, `host:port` or an `http(s)://` URL
    pub address: String,
    #[serde(default)]
    pub state_configs: HashMap<EffectiveState, StateLightConfig>,
    #[serde(default = "default_brightness")]
    pub default_brightness: i32,
    /// Zero disables transitions
    #[serde(default)]
    pub transition_ms: u32,
    /// Legacy color for muted and deafened
    #[serde(default)]
    pub muted_color: Option<Rgb>,
    /// Legacy color for connected and speaking
    #[serde(default)]
    pub unmuted_color: Option<Rgb>,
}

impl Device {
    pub fn new(id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            address: address.into(),
            state_configs: HashMap::new(),
            default_brightness: DEFAULT_BRIGHTNESS,
            transition_ms: 0,
            muted_color: None,
            unmuted_color: None,
        }
    }

    pub fn with_state(mut self, state: EffectiveState, config: StateLightConfig) -> Self {
        self.state_configs.insert(state, config);
        self
    }

    pub fn with_legacy_colors(mut self, muted: Rgb, unmuted: Rgb) -> Self {
        self.muted_color = Some(muted);
        self.unmuted_color = Some(unmuted);
        self
    }

    pub fn with_transition_ms(mut self, ms: u32) -> Self {
        self.transition_ms = ms;
        self
    }

    pub fn with_default_brightness(mut self, brightness: i32) -> Self {
        self.default_brightness = brightness;
        self
    }
}

/// A contiguous LED range on a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    pub device_id: String,
    #[serde(default)]
    pub name: String,
    pub led_start: u16,
    /// Inclusive
    pub led_end: u16,
    #[serde(default)]
    pub state_configs: HashMap<EffectiveState, StateLightConfig>,
    /// Overrides the device's default brightness for fallback colors
    #[serde(default)]
    pub brightness: Option<i32>,
    #[serde(default)]
    pub transition_ms: Option<u32>,
}

impl Zone {
    pub fn new(
        id: impl Into<String>,
        device_id: impl Into<String>,
        led_start: u16,
        led_end: u16,
    ) -> Self {
        Self {
            id: id.into(),
            device_id: device_id.into(),
            name: String::new(),
            led_start,
            led_end,
            state_configs: HashMap::new(),
            brightness: None,
            transition_ms: None,
        }
    }

    pub fn with_state(mut self, state: EffectiveState, config: StateLightConfig) -> Self {
        self.state_configs.insert(state, config);
        self
    }
}

/// Something a light command can be delivered to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LightTarget {
    /// A device without zones, addressed as a whole
    Device(Device),
    /// One zone of a device
    Zone { device: Device, zone: Zone },
}

impl LightTarget {
    /// Build a zone target, checking that the zone belongs to the device
    pub fn zone(device: Device, zone: Zone) -> Result<Self> {
        if zone.device_id != device.id {
            return Err(LightingError::InvalidTarget(format!(
                "zone {} belongs to device {}, not {}",
                zone.id, zone.device_id, device.id
            )));
        }
        Ok(LightTarget::Zone { device, zone })
    }

    pub fn device(&self) -> &Device {
        match self {
            LightTarget::Device(device) => device,
            LightTarget::Zone { device, .. } => device,
        }
    }

    /// `device` or `device/zone`
    pub fn id(&self) -> String {
        match self {
            LightTarget::Device(device) => device.id.clone(),
            LightTarget::Zone { device, zone } => format!("{}/{}", device.id, zone.id),
        }
    }

    pub fn address(&self) -> &str {
        &self.device().address
    }

    /// Brightness applied to fallback colors
    pub fn default_brightness(&self) -> i32 {
        match self {
            LightTarget::Device(device) => device.default_brightness,
            LightTarget::Zone { device, zone } => {
                zone.brightness.unwrap_or(device.default_brightness)
            }
        }
    }

    pub fn transition_ms(&self) -> u32 {
        match self {
            LightTarget::Device(device) => device.transition_ms,
            LightTarget::Zone { device, zone } => zone.transition_ms.unwrap_or(device.transition_ms),
        }
    }

    /// Expand devices and zones into independent delivery targets
    ///
    /// A device with zones is addressed zone by zone; one without is
    /// addressed as a whole. Zones whose device is unknown are skipped.
    pub fn expand(devices: &[Device], zones: &[Zone]) -> Vec<LightTarget> {
        let mut targets = Vec::new();

        for device in devices {
            let mut device_zones = zones.iter().filter(|z| z.device_id == device.id).peekable();
            if device_zones.peek().is_none() {
                targets.push(LightTarget::Device(device.clone()));
                continue;
            }
            for zone in device_zones {
                targets.push(LightTarget::Zone {
                    device: device.clone(),
                    zone: zone.clone(),
                });
            }
        }

        for zone in zones {
            if !devices.iter().any(|d| d.id == zone.device_id) {
                tracing::warn!("Skipping zone {} of unknown device {}", zone.id, zone.device_id);
            }
        }

        targets
    }
}
