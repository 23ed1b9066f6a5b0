//! JSON bodies exchanged with the device

use serde::{Deserialize, Serialize};

use crate::color::Rgb;

/// Default effect speed and intensity when only a color is set
pub const DEFAULT_EFFECT_LEVEL: u8 = 128;

/// Effect names that mark unused slots in the device's effect list
const PLACEHOLDER_EFFECTS: &[&str] = &["RSVD", "-"];

/// Body of `POST /json/state`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateCommand {
    pub on: bool,
    pub bri: u8,
    pub seg: Segment,
    /// Transition time in tenths of a second
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition: Option<u16>,
}

/// Segment part of a state command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Segment {
    /// Color and effect for the whole strip
    Whole {
        col: Vec<[u8; 3]>,
        fx: u8,
        sx: u8,
        ix: u8,
    },
    /// Color for the LED range `start..=end`, leaving the rest untouched
    Range { i: (u16, [u8; 3], u16) },
}

impl Segment {
    /// Whole-strip segment with a plain color and no effect
    pub fn solid(color: Rgb) -> Self {
        Segment::Whole {
            col: vec![color.to_array()],
            fx: 0,
            sx: DEFAULT_EFFECT_LEVEL,
            ix: DEFAULT_EFFECT_LEVEL,
        }
    }

    pub fn range(start: u16, end: u16, color: Rgb) -> Self {
        Segment::Range {
            i: (start, color.to_array(), end),
        }
    }
}

/// One entry of the device's effect list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Effect {
    /// Index in the device's list, used as `fx`
    pub id: u8,
    pub name: String,
}

/// The parts of `GET /json` this crate reads
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceInfo {
    #[serde(default)]
    pub effects: Vec<String>,
    #[serde(default)]
    pub info: Option<ProbeInfo>,
}

impl DeviceInfo {
    /// Usable effects, keeping each one's original index as its id
    pub fn usable_effects(&self) -> Vec<Effect> {
        self.effects
            .iter()
            .enumerate()
            .filter(|(_, name)| !PLACEHOLDER_EFFECTS.contains(&name.trim()))
            .filter_map(|(index, name)| {
                u8::try_from(index).ok().map(|id| Effect {
                    id,
                    name: name.clone(),
                })
            })
            .collect()
    }
}

/// Reply of `GET /json/info`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeInfo {
    #[serde(default)]
    pub name: Option<String>,
    /// Firmware version
    #[serde(default)]
    pub ver: Option<String>,
    #[serde(default)]
    pub mac: Option<String>,
}
