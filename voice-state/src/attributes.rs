//! Raw voice attributes observed from the voice client

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observation of the local user's voice status
///
/// Produced by the voice state source on every poll tick and every relevant
/// push event. Values are snapshots; consumers never mutate a shared copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceAttributes {
    pub in_voice_channel: bool,
    pub self_mute: bool,
    pub self_deaf: bool,
    pub server_mute: bool,
    pub server_deaf: bool,
    pub speaking: bool,
    pub streaming: bool,
    pub observed_at: DateTime<Utc>,
}

impl VoiceAttributes {
    /// Snapshot of a user who is not in any voice channel
    pub fn reset() -> Self {
        Self {
            in_voice_channel: false,
            self_mute: false,
            self_deaf: false,
            server_mute: false,
            server_deaf: false,
            speaking: false,
            streaming: false,
            observed_at: Utc::now(),
        }
    }

    /// Snapshot of a user sitting in a channel with every flag cleared
    pub fn in_channel() -> Self {
        Self {
            in_voice_channel: true,
            ..Self::reset()
        }
    }

    /// Compare every flag, ignoring the observation time
    pub fn same_flags(&self, other: &Self) -> bool {
        self.in_voice_channel == other.in_voice_channel
            && self.self_mute == other.self_mute
            && self.self_deaf == other.self_deaf
            && self.server_mute == other.server_mute
            && self.server_deaf == other.server_deaf
            && self.speaking == other.speaking
            && self.streaming == other.streaming
    }
}

impl Default for VoiceAttributes {
    fn default() -> Self {
        Self::reset()
    }
}
