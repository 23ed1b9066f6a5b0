//! From effective state to wire command
//!
//! Config precedence for a `(target, state)` pair, first hit wins: the
//! zone's own config, the device's config, the device's legacy muted or
//! unmuted color, then the built-in color for the state.

use light_api::{Rgb, Segment, StateCommand, DEFAULT_EFFECT_LEVEL};
use voice_state::EffectiveState;

use crate::model::{LightTarget, StateLightConfig};

/// Built-in color for a state
pub fn builtin_color(state: EffectiveState) -> Rgb {
    match state {
        EffectiveState::Idle => Rgb::new(255, 160, 60),
        EffectiveState::Connected => Rgb::new(0, 200, 80),
        EffectiveState::Speaking => Rgb::new(0, 255, 200),
        EffectiveState::Muted => Rgb::new(255, 120, 0),
        EffectiveState::Deafened => Rgb::new(255, 0, 0),
        EffectiveState::Streaming => Rgb::new(145, 70, 255),
    }
}

fn legacy_color(target: &LightTarget, state: EffectiveState) -> Option<Rgb> {
    let device = target.device();
    match state {
        EffectiveState::Muted | EffectiveState::Deafened => device.muted_color,
        EffectiveState::Connected | EffectiveState::Speaking => device.unmuted_color,
        EffectiveState::Idle | EffectiveState::Streaming => None,
    }
}

/// Pick the config for `state` on `target`
pub fn resolve_config(target: &LightTarget, state: EffectiveState) -> StateLightConfig {
    if let LightTarget::Zone { zone, .. } = target {
        if let Some(config) = zone.state_configs.get(&state) {
            return config.clone();
        }
    }

    if let Some(config) = target.device().state_configs.get(&state) {
        return config.clone();
    }

    let color = legacy_color(target, state).unwrap_or_else(|| builtin_color(state));
    StateLightConfig::new(color, target.default_brightness())
}

/// Clamp a configured brightness into the device's range
pub fn clamp_brightness(brightness: i32) -> u8 {
    u8::try_from(brightness.clamp(0, 255)).unwrap_or(u8::MAX)
}

/// Milliseconds to tenths of a second, `None` when transitions are off
///
/// Rounds to the nearest tenth but never turns a non-zero time into zero.
pub fn transition_deciseconds(ms: u32) -> Option<u16> {
    if ms == 0 {
        return None;
    }
    let tenths = (ms.saturating_add(50) / 100).max(1);
    Some(u16::try_from(tenths).unwrap_or(u16::MAX))
}

/// Encode `config` for `target`, or `None` if the config is disabled
///
/// Zone commands carry only a color over the LED range; effects apply to
/// whole-device targets.
pub fn encode(target: &LightTarget, config: &StateLightConfig) -> Option<StateCommand> {
    if !config.enabled {
        return None;
    }

    let seg = match target {
        LightTarget::Device(_) => {
            let (fx, sx, ix) = match config.effect {
                Some(effect) => (effect.effect_id, effect.speed, effect.intensity),
                None => (0, DEFAULT_EFFECT_LEVEL, DEFAULT_EFFECT_LEVEL),
            };
            Segment::Whole {
                col: vec![config.color.to_array()],
                fx,
                sx,
                ix,
            }
        }
        LightTarget::Zone { zone, .. } => Segment::range(zone.led_start, zone.led_end, config.color),
    };

    Some(StateCommand {
        on: true,
        bri: clamp_brightness(config.brightness),
        seg,
        transition: transition_deciseconds(target.transition_ms()),
    })
}

/// Resolve and encode in one step
pub fn command_for(target: &LightTarget, state: EffectiveState) -> Option<StateCommand> {
    encode(target, &resolve_config(target, state))
}
