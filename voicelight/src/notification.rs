use serde::Serialize;
use voice_state::{EffectiveState, VoiceAttributes};

/// What the core tells the outer application (tray, UI, CLI)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    Connected,
    Disconnected,
    /// The effective state changed; `attributes` is the snapshot behind it
    StateChanged {
        state: EffectiveState,
        attributes: VoiceAttributes,
    },
    /// A fan-out for `state` finished
    LightsApplied {
        state: EffectiveState,
        succeeded: usize,
        failed: usize,
    },
    /// Automatic reconnection gave up; call connect to try again
    ReconnectFailed { attempts: u32 },
}
