use crate::attributes::VoiceAttributes;

/// Events emitted by the connection supervisor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceEvent {
    /// A session was established
    Connected,
    /// The session ended, by request or because it was lost
    Disconnected,
    /// A raw observation from a poll tick or a push event
    AttributesObserved(VoiceAttributes),
    /// Automatic reconnection gave up after this many attempts
    ReconnectExhausted { attempts: u32 },
}
