//! Payload types exchanged with the voice client

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A user account as reported by the voice client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub username: String,
}

/// Reply to `GET_VOICE_SETTINGS` and payload of `VOICE_SETTINGS_UPDATE`
///
/// Only the fields this crate consumes are decoded; the rest are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceSettings {
    #[serde(default)]
    pub mute: bool,
    #[serde(default)]
    pub deaf: bool,
}

/// Per-member voice flags inside a channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberVoiceState {
    /// Muted by the server
    #[serde(default)]
    pub mute: bool,
    /// Deafened by the server
    #[serde(default)]
    pub deaf: bool,
    #[serde(default)]
    pub self_mute: bool,
    #[serde(default)]
    pub self_deaf: bool,
    /// Member is sharing their screen
    #[serde(default)]
    pub self_stream: bool,
    #[serde(default)]
    pub suppress: bool,
}

/// One entry of a channel's member list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMember {
    pub user: User,
    #[serde(default)]
    pub voice_state: MemberVoiceState,
}

/// Reply to `GET_SELECTED_VOICE_CHANNEL` when the user is in a channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedVoiceChannel {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub voice_states: Vec<ChannelMember>,
}

impl SelectedVoiceChannel {
    /// Voice flags of the given user, if they are a member of this channel
    pub fn member(&self, user_id: &str) -> Option<&MemberVoiceState> {
        self.voice_states
            .iter()
            .find(|m| m.user.id == user_id)
            .map(|m| &m.voice_state)
    }
}

/// Events the client can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    VoiceSettingsUpdate,
    VoiceChannelSelect,
    SpeakingStart,
    SpeakingStop,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::VoiceSettingsUpdate => "VOICE_SETTINGS_UPDATE",
            EventKind::VoiceChannelSelect => "VOICE_CHANNEL_SELECT",
            EventKind::SpeakingStart => "SPEAKING_START",
            EventKind::SpeakingStop => "SPEAKING_STOP",
        }
    }

    /// Whether subscribing requires a `channel_id` argument
    pub fn is_channel_scoped(self) -> bool {
        matches!(self, EventKind::SpeakingStart | EventKind::SpeakingStop)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Push notifications delivered outside of request/response pairs
#[derive(Debug, Clone, PartialEq)]
pub enum RpcEvent {
    VoiceSettingsUpdate(VoiceSettings),
    VoiceChannelSelect { channel_id: Option<String> },
    SpeakingStart { user_id: String, channel_id: Option<String> },
    SpeakingStop { user_id: String, channel_id: Option<String> },
    /// Any dispatch this crate does not decode
    Other { evt: String, data: Value },
    /// The session ended; no more events follow
    Closed { reason: Option<String> },
}

#[derive(Deserialize)]
struct ChannelSelectData {
    #[serde(default)]
    channel_id: Option<String>,
}

#[derive(Deserialize)]
struct SpeakingData {
    user_id: String,
    #[serde(default)]
    channel_id: Option<String>,
}

impl RpcEvent {
    /// Decode a `DISPATCH` payload into a typed event
    ///
    /// Payloads that fail to decode are kept as [`RpcEvent::Other`] so a
    /// malformed push never tears down the session.
    pub fn from_dispatch(evt: &str, data: Value) -> Self {
        let decoded = match evt {
            "VOICE_SETTINGS_UPDATE" => serde_json::from_value::<VoiceSettings>(data.clone())
                .ok()
                .map(RpcEvent::VoiceSettingsUpdate),
            "VOICE_CHANNEL_SELECT" => serde_json::from_value::<ChannelSelectData>(data.clone())
                .ok()
                .map(|d| RpcEvent::VoiceChannelSelect {
                    channel_id: d.channel_id,
                }),
            "SPEAKING_START" => serde_json::from_value::<SpeakingData>(data.clone())
                .ok()
                .map(|d| RpcEvent::SpeakingStart {
                    user_id: d.user_id,
                    channel_id: d.channel_id,
                }),
            "SPEAKING_STOP" => serde_json::from_value::<SpeakingData>(data.clone())
                .ok()
                .map(|d| RpcEvent::SpeakingStop {
                    user_id: d.user_id,
                    channel_id: d.channel_id,
                }),
            _ => None,
        };

        decoded.unwrap_or_else(|| RpcEvent::Other {
            evt: evt.to_string(),
            data,
        })
    }
}
