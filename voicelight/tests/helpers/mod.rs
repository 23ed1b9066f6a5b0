//! Fakes for the voice client and the LED devices

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use light_api::{DeviceAddress, DeviceClient, DeviceError, DeviceRequest, DeviceTransport, Method};
use parking_lot::Mutex;
use rpc_client::{
    ChannelMember, EventKind, MemberVoiceState, RpcError, RpcEvent, SelectedVoiceChannel, User,
    VoiceSettings,
};
use serde_json::Value;
use tokio::sync::mpsc;
use voice_state::{EffectiveState, RpcConnector, RpcSession, VoiceRpc};
use voicelight::Notification;

#[derive(Default)]
struct VoiceClientState {
    channel: Option<SelectedVoiceChannel>,
    settings: VoiceSettings,
}

/// A voice client whose state the test changes between polls
#[derive(Default)]
pub struct FakeVoiceClient {
    state: Mutex<VoiceClientState>,
}

impl FakeVoiceClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn join(&self, member: MemberVoiceState) {
        self.state.lock().channel = Some(SelectedVoiceChannel {
            id: "general".to_string(),
            name: Some("General".to_string()),
            guild_id: None,
            voice_states: vec![ChannelMember {
                user: User {
                    id: "me".to_string(),
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
}

#[async_trait]
impl VoiceRpc for FakeVoiceClient {
    fn user_id(&self) -> Option<String> {
        Some("me".to_string())
    }

    async fn selected_voice_channel(&self) -> rpc_client::Result<Option<SelectedVoiceChannel>> {
        Ok(self.state.lock().channel.clone())
    }

    async fn voice_settings(&self) -> rpc_client::Result<VoiceSettings> {
        Ok(self.state.lock().settings)
    }

    async fn subscribe(&self, _kind: EventKind, _channel_id: Option<&str>) -> rpc_client::Result<()> {
        Ok(())
    }

    async fn unsubscribe(&self, _kind: EventKind, _channel_id: Option<&str>) -> rpc_client::Result<()> {
        Ok(())
    }

    async fn close(&self) {}
}

/// Hands out the given sessions in order, then refuses
pub struct FakeConnector {
    sessions: Mutex<VecDeque<Arc<FakeVoiceClient>>>,
    senders: Mutex<Vec<mpsc::UnboundedSender<RpcEvent>>>,
}

impl FakeConnector {
    pub fn new(sessions: Vec<Arc<FakeVoiceClient>>) -> Arc<Self> {
        Arc::new(Self {
            sessions: Mutex::new(sessions.into()),
            senders: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl RpcConnector for FakeConnector {
    async fn connect(&self) -> rpc_client::Result<RpcSession> {
        let next = self.sessions.lock().pop_front();
        match next {
            Some(client) => {
                let (tx, rx) = mpsc::unbounded_channel();
                self.senders.lock().push(tx);
                let rpc: Arc<dyn VoiceRpc> = client;
                Ok((rpc, rx))
            }
            None => Err(RpcError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "voice client not running",
            ))),
        }
    }
}

/// Devices that remember the requests they got and answer state reads
#[derive(Default)]
pub struct FakeDevices {
    state: Mutex<String>,
    requests: Mutex<Vec<(String, DeviceRequest)>>,
}

impl FakeDevices {
    /// Every device reports `state` on `GET /json/state`
    pub fn with_state(state: &str) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(state.to_string()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn client(self: &Arc<Self>) -> DeviceClient {
        DeviceClient::with_transport(self.clone())
    }

    pub fn requests(&self) -> Vec<(String, DeviceRequest)> {
        self.requests.lock().clone()
    }

    /// Parsed bodies of the state commands sent to `address`
    pub fn posted_to(&self, address: &str) -> Vec<Value> {
        let key = DeviceAddress::parse(address).unwrap().to_string();
        self.requests
            .lock()
            .iter()
            .filter(|(a, r)| *a == key && r.method == Method::Post)
            .filter_map(|(_, r)| r.body.as_deref())
            .map(|body| serde_json::from_str(body).unwrap())
            .collect()
    }
}

#[async_trait]
impl DeviceTransport for FakeDevices {
    async fn send(
        &self,
        address: &DeviceAddress,
        request: &DeviceRequest,
        _timeout: Duration,
    ) -> Result<String, DeviceError> {
        self.requests
            .lock()
            .push((address.to_string(), request.clone()));
        match request.method {
            Method::Get => Ok(self.state.lock().clone()),
            Method::Post => Ok(r#"{"success":true}"#.to_string()),
        }
    }
}

pub async fn next_notification(rx: &mut mpsc::UnboundedReceiver<Notification>) -> Notification {
    tokio::time::timeout(Duration::from_secs(60), rx.recv())
        .await
        .expect("timed out waiting for a notification")
        .expect("notification channel closed")
}

/// Next state change, skipping everything else
pub async fn next_state(rx: &mut mpsc::UnboundedReceiver<Notification>) -> EffectiveState {
    loop {
        if let Notification::StateChanged { state, .. } = next_notification(rx).await {
            return state;
        }
    }
}

/// Wait until the fan-out for `state` reports back
pub async fn lights_applied(
    rx: &mut mpsc::UnboundedReceiver<Notification>,
    want: EffectiveState,
) -> (usize, usize) {
    loop {
        if let Notification::LightsApplied {
            state,
            succeeded,
            failed,
        } = next_notification(rx).await
        {
            if state == want {
                return (succeeded, failed);
            }
        }
    }
}
