//! Fakes for the RPC seams used by the voice-state integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rpc_client::{
    ChannelMember, EventKind, MemberVoiceState, RpcError, RpcEvent, SelectedVoiceChannel, User,
    VoiceSettings,
};
use tokio::sync::mpsc;
use tokio::time::Instant;
use voice_state::{RpcConnector, RpcSession, VoiceAttributes, VoiceEvent, VoiceRpc};

/// Scripted poll failures
#[derive(Debug, Clone)]
pub enum Failure {
    NotAuthenticated,
    Lost,
    Other(String),
}

impl Failure {
    fn to_error(&self) -> RpcError {
        match self {
            Failure::NotAuthenticated => RpcError::Response {
                code: rpc_client::NOT_AUTHENTICATED,
                message: "Not authenticated or invalid scope".to_string(),
            },
            Failure::Lost => RpcError::Closed(Some("pipe closed".to_string())),
            Failure::Other(message) => RpcError::Protocol(message.clone()),
        }
    }
}

#[derive(Default)]
struct FakeState {
    channel: Option<SelectedVoiceChannel>,
    settings: VoiceSettings,
    failure: Option<Failure>,
    subscriptions: Vec<(EventKind, Option<String>)>,
    subscription_delay: Option<Duration>,
    subscriptions_fail: bool,
    polls: usize,
    closed: bool,
}

/// In-memory stand-in for a voice client session
pub struct FakeRpc {
    user: Option<String>,
    state: Mutex<FakeState>,
}

impl FakeRpc {
    pub fn new(user: &str) -> Arc<Self> {
        Arc::new(Self {
            user: Some(user.to_string()),
            state: Mutex::new(FakeState::default()),
        })
    }

    /// Put the local user into `channel_id` with the given member flags
    pub fn join(&self, channel_id: &str, member: MemberVoiceState) {
        let user = self.user.clone().unwrap_or_default();
        self.state.lock().channel = Some(SelectedVoiceChannel {
            id: channel_id.to_string(),
            name: None,
            guild_id: None,
            voice_states: vec![ChannelMember {
                user: User {
                    id: user,
                    username: "tester".to_string(),
                },
                voice_state: member,
            }],
        });
    }

    pub fn leave(&self) {
        self.state.lock().channel = None;
    }

    pub fn set_settings(&self, mute: bool, deaf: bool) {
        self.state.lock().settings = VoiceSettings { mute, deaf };
    }

    pub fn fail(&self, failure: Option<Failure>) {
        self.state.lock().failure = failure;
    }

    /// Make every subscribe and unsubscribe wait `delay` before answering
    pub fn delay_subscriptions(&self, delay: Duration) {
        self.state.lock().subscription_delay = Some(delay);
    }

    /// Make every subscribe and unsubscribe fail
    pub fn fail_subscriptions(&self) {
        self.state.lock().subscriptions_fail = true;
    }

    /// Hold subscription calls until the settings allow them through
    async fn subscription_gate(&self, cmd: &str) -> rpc_client::Result<()> {
        let (delay, fail) = {
            let state = self.state.lock();
            (state.subscription_delay, state.subscriptions_fail)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(RpcError::Timeout(cmd.to_string()));
        }
        Ok(())
    }

    pub fn polls(&self) -> usize {
        self.state.lock().polls
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Channels with an active speaking-start subscription
    pub fn speaking_channels(&self) -> Vec<String> {
        self.state
            .lock()
            .subscriptions
            .iter()
            .filter(|(kind, _)| *kind == EventKind::SpeakingStart)
            .filter_map(|(_, channel)| channel.clone())
            .collect()
    }

    pub fn is_subscribed(&self, kind: EventKind) -> bool {
        self.state
            .lock()
            .subscriptions
            .iter()
            .any(|(k, _)| *k == kind)
    }
}

#[async_trait]
impl VoiceRpc for FakeRpc {
    fn user_id(&self) -> Option<String> {
        self.user.clone()
    }

    async fn selected_voice_channel(&self) -> rpc_client::Result<Option<SelectedVoiceChannel>> {
        let mut state = self.state.lock();
        state.polls += 1;
        match &state.failure {
            Some(failure) => Err(failure.to_error()),
            None => Ok(state.channel.clone()),
        }
    }

    async fn voice_settings(&self) -> rpc_client::Result<VoiceSettings> {
        let state = self.state.lock();
        match &state.failure {
            Some(failure) => Err(failure.to_error()),
            None => Ok(state.settings),
        }
    }

    async fn subscribe(&self, kind: EventKind, channel_id: Option<&str>) -> rpc_client::Result<()> {
        self.subscription_gate("SUBSCRIBE").await?;
        self.state
            .lock()
            .subscriptions
            .push((kind, channel_id.map(str::to_string)));
        Ok(())
    }

    async fn unsubscribe(
        &self,
        kind: EventKind,
        channel_id: Option<&str>,
    ) -> rpc_client::Result<()> {
        self.subscription_gate("UNSUBSCRIBE").await?;
        self.state
            .lock()
            .subscriptions
            .retain(|(k, c)| !(*k == kind && c.as_deref() == channel_id));
        Ok(())
    }

    async fn close(&self) {
        self.state.lock().closed = true;
    }
}

/// Outcome of one scripted connect call
pub enum Script {
    Fail,
    /// Hang for an hour, then fail
    Stall,
    Session(Arc<FakeRpc>),
}

/// Connector that replays a script, failing once the script runs out
#[derive(Default)]
pub struct FakeConnector {
    script: Mutex<VecDeque<Script>>,
    attempts: Mutex<Vec<Instant>>,
    senders: Mutex<Vec<mpsc::UnboundedSender<RpcEvent>>>,
}

impl FakeConnector {
    pub fn new(script: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            ..Default::default()
        })
    }

    pub fn always_failing() -> Arc<Self> {
        Self::new(Vec::new())
    }

    pub fn push(&self, step: Script) {
        self.script.lock().push_back(step);
    }

    pub fn attempts(&self) -> usize {
        self.attempts.lock().len()
    }

    /// Time between consecutive connect calls
    pub fn gaps(&self) -> Vec<Duration> {
        let attempts = self.attempts.lock();
        attempts.windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// Simulate the voice client dropping the most recent session
    pub fn drop_session(&self) {
        self.senders.lock().pop();
    }
}

#[async_trait]
impl RpcConnector for FakeConnector {
    async fn connect(&self) -> rpc_client::Result<RpcSession> {
        self.attempts.lock().push(Instant::now());
        let step = self.script.lock().pop_front();
        match step {
            Some(Script::Session(rpc)) => {
                let (tx, rx) = mpsc::unbounded_channel();
                self.senders.lock().push(tx);
                let rpc: Arc<dyn VoiceRpc> = rpc;
                Ok((rpc, rx))
            }
            Some(Script::Stall) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(RpcError::Timeout("AUTHORIZE".to_string()))
            }
            Some(Script::Fail) | None => Err(RpcError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "voice client not running",
            ))),
        }
    }
}

/// Wait, in small steps of virtual time, until `condition` holds
pub async fn eventually(condition: impl Fn() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    condition()
}

/// Next attribute snapshot, skipping connectivity events
pub async fn next_attributes(events: &mut mpsc::UnboundedReceiver<VoiceEvent>) -> VoiceAttributes {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(60), events.recv())
            .await
            .expect("timed out waiting for attributes")
            .expect("event channel closed");
        if let VoiceEvent::AttributesObserved(attrs) = event {
            return attrs;
        }
    }
}

/// Next connectivity event, skipping attribute snapshots
pub async fn next_transition(events: &mut mpsc::UnboundedReceiver<VoiceEvent>) -> VoiceEvent {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(3600), events.recv())
            .await
            .expect("timed out waiting for a transition")
            .expect("event channel closed");
        if !matches!(event, VoiceEvent::AttributesObserved(_)) {
            return event;
        }
    }
}
