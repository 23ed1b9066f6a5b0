//! Voice state acquisition for one RPC session
//!
//! The recurring poll is the source of truth. Push events only shorten the
//! delay between a change in the voice client and the next observation, so
//! subscription requests run on their own task and never hold up a poll.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rpc_client::{EventKind, RpcError, RpcEvent};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::attributes::VoiceAttributes;
use crate::event::VoiceEvent;
use crate::rpc::VoiceRpc;

/// Why a source stopped running
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceExit {
    /// The RPC session went away
    ConnectionLost(Option<String>),
    /// Nobody is listening for observations any more
    Stopped,
}

/// Subscription changes, applied in order by the subscription worker
#[derive(Debug)]
enum SubscriptionRequest {
    Subscribe(EventKind, Option<String>),
    Unsubscribe(EventKind, Option<String>),
}

/// Background task issuing subscription requests for one session
///
/// Failures are logged and dropped. The task is aborted with the source.
struct SubscriptionWorker {
    requests: mpsc::UnboundedSender<SubscriptionRequest>,
    task: JoinHandle<()>,
}

impl SubscriptionWorker {
    fn spawn(rpc: Arc<dyn VoiceRpc>) -> Self {
        let (requests, mut pending) = mpsc::unbounded_channel();
        let task = tokio::spawn(async move {
            while let Some(request) = pending.recv().await {
                match request {
                    SubscriptionRequest::Subscribe(kind, channel) => {
                        if let Err(e) = rpc.subscribe(kind, channel.as_deref()).await {
                            tracing::debug!(
                                "Subscription to {} ({}) failed: {}",
                                kind,
                                channel.as_deref().unwrap_or("global"),
                                e
                            );
                        }
                    }
                    SubscriptionRequest::Unsubscribe(kind, channel) => {
                        if let Err(e) = rpc.unsubscribe(kind, channel.as_deref()).await {
                            tracing::debug!(
                                "Unsubscribe from {} ({}) failed: {}",
                                kind,
                                channel.as_deref().unwrap_or("global"),
                                e
                            );
                        }
                    }
                }
            }
        });
        Self { requests, task }
    }

    fn send(&self, request: SubscriptionRequest) {
        if self.requests.send(request).is_err() {
            tracing::trace!("Subscription worker already stopped");
        }
    }
}

impl Drop for SubscriptionWorker {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Polls and listens to one RPC session, emitting attribute snapshots
pub struct VoiceStateSource {
    rpc: Arc<dyn VoiceRpc>,
    sink: mpsc::UnboundedSender<VoiceEvent>,
    subscriptions: SubscriptionWorker,
    attributes: VoiceAttributes,
    speaking_channel: Option<String>,
    last_poll_error: Option<String>,
}

impl VoiceStateSource {
    /// Must be called from within a tokio runtime
    pub fn new(rpc: Arc<dyn VoiceRpc>, sink: mpsc::UnboundedSender<VoiceEvent>) -> Self {
        Self {
            subscriptions: SubscriptionWorker::spawn(Arc::clone(&rpc)),
            rpc,
            sink,
            attributes: VoiceAttributes::reset(),
            speaking_channel: None,
            last_poll_error: None,
        }
    }

    /// Run until the session is lost or the sink is dropped
    ///
    /// The first poll fires immediately. A new value on `poll_interval`
    /// restarts the ticker with that period.
    pub async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<RpcEvent>,
        mut poll_interval: watch::Receiver<Duration>,
    ) -> SourceExit {
        self.subscribe_global();

        let mut ticker = ticker(Instant::now(), *poll_interval.borrow_and_update());

        loop {
            let step = tokio::select! {
                _ = ticker.tick() => self.poll().await,
                changed = poll_interval.changed() => {
                    if changed.is_err() {
                        return SourceExit::Stopped;
                    }
                    let period = *poll_interval.borrow_and_update();
                    tracing::debug!("Voice poll interval set to {:?}", period);
                    ticker = ticker_after(period);
                    Ok(())
                }
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => Err(SourceExit::ConnectionLost(None)),
                },
            };

            if let Err(exit) = step {
                if let SourceExit::ConnectionLost(reason) = &exit {
                    tracing::debug!("Voice state source stopping: {:?}", reason);
                }
                return exit;
            }
        }
    }

    /// Subscribe to session-wide push events
    fn subscribe_global(&self) {
        for kind in [EventKind::VoiceSettingsUpdate, EventKind::VoiceChannelSelect] {
            self.subscriptions.send(SubscriptionRequest::Subscribe(kind, None));
        }
    }

    /// One full observation of the voice client
    pub async fn poll(&mut self) -> Result<(), SourceExit> {
        let channel = match self.rpc.selected_voice_channel().await {
            Ok(channel) => channel,
            Err(e) => return self.poll_failed(e),
        };

        let Some(channel) = channel else {
            self.last_poll_error = None;
            self.leave_channel();
            return self.emit();
        };

        self.follow_channel(Some(&channel.id));

        let settings = match self.rpc.voice_settings().await {
            Ok(settings) => settings,
            Err(e) => return self.poll_failed(e),
        };
        self.last_poll_error = None;

        let member = self
            .rpc
            .user_id()
            .and_then(|id| channel.member(&id).copied())
            .unwrap_or_default();

        self.attributes = VoiceAttributes {
            in_voice_channel: true,
            self_mute: settings.mute,
            self_deaf: settings.deaf,
            server_mute: member.mute,
            server_deaf: member.deaf,
            speaking: self.attributes.speaking,
            streaming: member.self_stream,
            observed_at: Utc::now(),
        };
        self.emit()
    }

    fn poll_failed(&mut self, error: RpcError) -> Result<(), SourceExit> {
        if error.is_connection_lost() {
            return Err(SourceExit::ConnectionLost(Some(error.to_string())));
        }

        if error.is_expected_absence() {
            tracing::debug!("Voice state unavailable: {}", error);
        } else {
            let message = error.to_string();
            if self.last_poll_error.as_deref() == Some(message.as_str()) {
                tracing::debug!("Voice poll still failing: {}", message);
            } else {
                tracing::warn!("Voice poll failed: {}", message);
                self.last_poll_error = Some(message);
            }
        }

        self.leave_channel();
        self.emit()
    }

    async fn handle_event(&mut self, event: RpcEvent) -> Result<(), SourceExit> {
        match event {
            RpcEvent::VoiceSettingsUpdate(settings) => {
                if !self.attributes.in_voice_channel {
                    return Ok(());
                }
                self.attributes.self_mute = settings.mute;
                self.attributes.self_deaf = settings.deaf;
                self.emit()
            }
            RpcEvent::VoiceChannelSelect { channel_id: None } => {
                self.leave_channel();
                self.emit()
            }
            RpcEvent::VoiceChannelSelect { channel_id: Some(_) } => self.poll().await,
            RpcEvent::SpeakingStart { user_id, .. } => self.set_speaking(&user_id, true),
            RpcEvent::SpeakingStop { user_id, .. } => self.set_speaking(&user_id, false),
            RpcEvent::Other { evt, .. } => {
                tracing::trace!("Ignoring voice client event {}", evt);
                Ok(())
            }
            RpcEvent::Closed { reason } => Err(SourceExit::ConnectionLost(reason)),
        }
    }

    fn set_speaking(&mut self, user_id: &str, speaking: bool) -> Result<(), SourceExit> {
        if !self.attributes.in_voice_channel {
            return Ok(());
        }
        if self.rpc.user_id().as_deref() != Some(user_id) {
            return Ok(());
        }
        if self.attributes.speaking == speaking {
            return Ok(());
        }
        self.attributes.speaking = speaking;
        self.emit()
    }

    /// Move channel-scoped speaking subscriptions to `channel_id`
    fn follow_channel(&mut self, channel_id: Option<&str>) {
        if self.speaking_channel.as_deref() == channel_id {
            return;
        }

        if let Some(old) = self.speaking_channel.take() {
            for kind in [EventKind::SpeakingStart, EventKind::SpeakingStop] {
                self.subscriptions
                    .send(SubscriptionRequest::Unsubscribe(kind, Some(old.clone())));
            }
        }

        self.attributes.speaking = false;

        if let Some(new) = channel_id {
            for kind in [EventKind::SpeakingStart, EventKind::SpeakingStop] {
                self.subscriptions
                    .send(SubscriptionRequest::Subscribe(kind, Some(new.to_string())));
            }
            self.speaking_channel = Some(new.to_string());
        }
    }

    fn leave_channel(&mut self) {
        self.follow_channel(None);
        self.attributes = VoiceAttributes::reset();
    }

    fn emit(&mut self) -> Result<(), SourceExit> {
        self.attributes.observed_at = Utc::now();
        self.sink
            .send(VoiceEvent::AttributesObserved(self.attributes.clone()))
            .map_err(|_| SourceExit::Stopped)
    }
}

fn ticker(start: Instant, period: Duration) -> tokio::time::Interval {
    let mut ticker = tokio::time::interval_at(start, period.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

fn ticker_after(period: Duration) -> tokio::time::Interval {
    ticker(Instant::now() + period, period)
}
