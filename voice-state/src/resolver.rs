//! Effective state resolution and edge detection

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::attributes::VoiceAttributes;

/// The single discrete voice status used to pick a lighting configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectiveState {
    Idle,
    Connected,
    Speaking,
    Muted,
    Deafened,
    Streaming,
}

impl EffectiveState {
    /// Every state, in declaration order
    pub const ALL: [EffectiveState; 6] = [
        EffectiveState::Idle,
        EffectiveState::Connected,
        EffectiveState::Speaking,
        EffectiveState::Muted,
        EffectiveState::Deafened,
        EffectiveState::Streaming,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EffectiveState::Idle => "idle",
            EffectiveState::Connected => "connected",
            EffectiveState::Speaking => "speaking",
            EffectiveState::Muted => "muted",
            EffectiveState::Deafened => "deafened",
            EffectiveState::Streaming => "streaming",
        }
    }
}

impl fmt::Display for EffectiveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve raw attributes into an effective state
///
/// Priority, first match wins: not in a channel, streaming, deafened
/// (self or server), muted (self or server), speaking, connected.
pub fn resolve(attrs: &VoiceAttributes) -> EffectiveState {
    if !attrs.in_voice_channel {
        EffectiveState::Idle
    } else if attrs.streaming {
        EffectiveState::Streaming
    } else if attrs.self_deaf || attrs.server_deaf {
        EffectiveState::Deafened
    } else if attrs.self_mute || attrs.server_mute {
        EffectiveState::Muted
    } else if attrs.speaking {
        EffectiveState::Speaking
    } else {
        EffectiveState::Connected
    }
}

/// A change of effective state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    /// `None` for the first observation
    pub previous: Option<EffectiveState>,
    pub current: EffectiveState,
    /// The snapshot that produced `current`
    pub attributes: VoiceAttributes,
}

/// Edge-triggered resolver
///
/// Remembers the last emitted state and reports a change only when a new
/// observation resolves to something different.
#[derive(Debug, Default)]
pub struct StateResolver {
    last: Option<EffectiveState>,
}

impl StateResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last emitted state
    pub fn current(&self) -> Option<EffectiveState> {
        self.last
    }

    /// Feed one observation, returning a change if the state moved
    pub fn observe(&mut self, attrs: &VoiceAttributes) -> Option<StateChange> {
        let state = resolve(attrs);
        if self.last == Some(state) {
            return None;
        }

        let previous = self.last.replace(state);
        tracing::debug!("Effective voice state {:?} -> {}", previous, state);
        Some(StateChange {
            previous,
            current: state,
            attributes: attrs.clone(),
        })
    }

    /// Forget the last state so the next observation always emits
    pub fn reset(&mut self) {
        self.last = None;
    }
}
