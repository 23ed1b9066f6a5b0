//! Wiring between voice events, the lighting controller and notifications

use std::sync::Arc;

use lighting::{FanOutReport, LightingController};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use voice_state::{EffectiveState, StateResolver, VoiceEvent};

use crate::notification::Notification;
use crate::targets::TargetProvider;

/// Consumes supervisor events and drives the lights
///
/// State changes are announced right away; the fan-out for that state runs
/// in its own task and reports back with [`Notification::LightsApplied`].
/// A newer state does not cancel an older fan-out that is still retrying.
pub struct Orchestrator {
    controller: LightingController,
    targets: Arc<dyn TargetProvider>,
    notifications: mpsc::UnboundedSender<Notification>,
    resolver: StateResolver,
    current: Arc<RwLock<Option<EffectiveState>>>,
    in_flight: Vec<JoinHandle<()>>,
}

impl Orchestrator {
    pub fn new(
        controller: LightingController,
        targets: Arc<dyn TargetProvider>,
        notifications: mpsc::UnboundedSender<Notification>,
    ) -> Self {
        Self {
            controller,
            targets,
            notifications,
            resolver: StateResolver::new(),
            current: Arc::new(RwLock::new(None)),
            in_flight: Vec::new(),
        }
    }

    /// Shared view of the last effective state
    pub fn current_state(&self) -> Arc<RwLock<Option<EffectiveState>>> {
        Arc::clone(&self.current)
    }

    /// Handle events until the supervisor goes away, then wait for
    /// outstanding fan-outs
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<VoiceEvent>) {
        while let Some(event) = events.recv().await {
            self.handle(event);
        }
        self.drain().await;
        tracing::debug!("Orchestrator stopped");
    }

    pub fn handle(&mut self, event: VoiceEvent) {
        self.in_flight.retain(|task| !task.is_finished());

        match event {
            VoiceEvent::Connected => self.notify(Notification::Connected),
            VoiceEvent::Disconnected => self.notify(Notification::Disconnected),
            VoiceEvent::ReconnectExhausted { attempts } => {
                self.notify(Notification::ReconnectFailed { attempts })
            }
            VoiceEvent::AttributesObserved(attributes) => {
                let Some(change) = self.resolver.observe(&attributes) else {
                    return;
                };
                tracing::info!("Voice state changed to {}", change.current);
                *self.current.write() = Some(change.current);
                self.notify(Notification::StateChanged {
                    state: change.current,
                    attributes: change.attributes,
                });
                let task = self.spawn_fan_out(change.current);
                self.in_flight.push(task);
            }
        }
    }

    /// Wait for every fan-out that is still running
    pub async fn drain(&mut self) {
        for task in self.in_flight.drain(..) {
            if let Err(e) = task.await {
                tracing::warn!("Fan-out task failed: {}", e);
            }
        }
    }

    fn spawn_fan_out(&self, state: EffectiveState) -> JoinHandle<()> {
        let controller = self.controller.clone();
        let targets = self.targets.targets();
        let notifications = self.notifications.clone();

        tokio::spawn(async move {
            let report = controller.apply_all(&targets, state).await;
            log_report(&report);
            let _ = notifications.send(Notification::LightsApplied {
                state,
                succeeded: report.succeeded(),
                failed: report.failed(),
            });
        })
    }

    fn notify(&self, notification: Notification) {
        if self.notifications.send(notification).is_err() {
            tracing::trace!("No notification listener");
        }
    }
}

pub(crate) fn log_report(report: &FanOutReport) {
    if report.failed() == 0 {
        tracing::debug!("Applied {} to {} targets", report.state, report.succeeded());
    } else {
        tracing::info!(
            "Applied {} to {} of {} targets",
            report.state,
            report.succeeded(),
            report.results.len()
        );
    }
}
