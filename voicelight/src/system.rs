//! The assembled application core

use std::sync::Arc;

use light_api::DeviceClient;
use lighting::{FanOutReport, LightingController, StateCaptureStore};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use voice_state::{
    ConnectionStatus, ConnectionSupervisor, EffectiveState, IpcConnector, RpcConnector,
};

use crate::config::VoiceLightConfig;
use crate::error::Result;
use crate::notification::Notification;
use crate::orchestrator::{log_report, Orchestrator};
use crate::targets::TargetProvider;

/// Voice-driven lighting, running
///
/// Owns the connection supervisor, the orchestrator task, the lighting
/// controller and the capture store.
pub struct VoiceLight {
    supervisor: ConnectionSupervisor,
    controller: LightingController,
    captures: StateCaptureStore,
    targets: Arc<dyn TargetProvider>,
    current: Arc<RwLock<Option<EffectiveState>>>,
    orchestrator: JoinHandle<()>,
    restore_on_shutdown: bool,
}

impl VoiceLight {
    /// Start against the local voice client and real devices
    pub async fn start(
        config: VoiceLightConfig,
        targets: Arc<dyn TargetProvider>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<Notification>)> {
        let connector = Arc::new(IpcConnector::new(&config.voice)?);
        Self::start_with(config, targets, connector, DeviceClient::new()).await
    }

    /// Start with an explicit connector and device client
    ///
    /// Captures every device first when configured to, then connects.
    pub async fn start_with(
        config: VoiceLightConfig,
        targets: Arc<dyn TargetProvider>,
        connector: Arc<dyn RpcConnector>,
        client: DeviceClient,
    ) -> Result<(Self, mpsc::UnboundedReceiver<Notification>)> {
        config.validate()?;

        let controller = LightingController::with_client(client, config.lighting.clone())?;
        let captures = StateCaptureStore::new(controller.clone());

        if config.capture_on_start {
            for (device_id, result) in captures.capture_all(&targets.devices()).await {
                if let Err(e) = result {
                    tracing::warn!("Could not capture state of device {}: {}", device_id, e);
                }
            }
        }

        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        let (supervisor, events) = ConnectionSupervisor::spawn(connector, config.voice.clone())?;

        let orchestrator = Orchestrator::new(controller.clone(), Arc::clone(&targets), notify_tx);
        let current = orchestrator.current_state();
        let orchestrator = tokio::spawn(orchestrator.run(events));

        supervisor.connect()?;
        tracing::info!("voicelight started with {} targets", targets.targets().len());

        Ok((
            Self {
                supervisor,
                controller,
                captures,
                targets,
                current,
                orchestrator,
                restore_on_shutdown: config.restore_on_shutdown,
            },
            notify_rx,
        ))
    }

    pub fn supervisor(&self) -> &ConnectionSupervisor {
        &self.supervisor
    }

    pub fn controller(&self) -> &LightingController {
        &self.controller
    }

    pub fn captures(&self) -> &StateCaptureStore {
        &self.captures
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.supervisor.status()
    }

    /// Last effective state, if any was observed
    pub fn current_state(&self) -> Option<EffectiveState> {
        *self.current.read()
    }

    /// Deliver the current state again, e.g. after targets were edited
    pub async fn reapply(&self) -> Option<FanOutReport> {
        let state = self.current_state()?;
        let report = self
            .controller
            .apply_all(&self.targets.targets(), state)
            .await;
        log_report(&report);
        Some(report)
    }

    /// Stop everything and, when configured, restore captured device states
    pub async fn shutdown(self) -> Result<()> {
        self.supervisor.shutdown().await;
        if let Err(e) = self.orchestrator.await {
            tracing::warn!("Orchestrator task failed: {}", e);
        }

        if self.restore_on_shutdown {
            for (device_id, result) in self.captures.restore_all().await {
                match result {
                    Ok(()) => tracing::debug!("Restored device {}", device_id),
                    Err(e) => tracing::warn!("Could not restore device {}: {}", device_id, e),
                }
            }
        }

        tracing::info!("voicelight stopped");
        Ok(())
    }
}
