//! Delivery of light commands to devices
//!
//! Every delivery is independent: one target failing never blocks or fails
//! another. Writes retry with linear backoff; reads and probes do not.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::future::join_all;
use light_api::{
    DeviceAddress, DeviceClient, DeviceError, DeviceOperation, Effect, GetDeviceInfo, GetState,
    Probe, SetState, StateCommand,
};
use serde_json::Value;
use voice_state::EffectiveState;

use crate::config::LightingConfig;
use crate::error::{LightingError, Result};
use crate::mapping;
use crate::model::{LightTarget, StateLightConfig};

/// Result of delivering to one target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The device accepted the command
    Applied { attempts: u32 },
    /// The state is disabled for this target; nothing was sent
    Skipped,
}

/// Last known reachability of a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceStatus {
    pub online: bool,
    pub updated_at: DateTime<Utc>,
    pub last_error: Option<String>,
}

/// Per-target results of one fan-out
#[derive(Debug, Clone)]
pub struct FanOutReport {
    pub state: EffectiveState,
    pub results: Vec<TargetResult>,
}

#[derive(Debug, Clone)]
pub struct TargetResult {
    pub target_id: String,
    pub result: Result<ApplyOutcome>,
}

impl FanOutReport {
    /// Targets that accepted or deliberately skipped the update
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &LightingError)> {
        self.results.iter().filter_map(|r| match &r.result {
            Ok(_) => None,
            Err(e) => Some((r.target_id.as_str(), e)),
        })
    }
}

/// Sends voice-state lighting to devices
///
/// Cheap to clone; clones share the device client and the status cache.
#[derive(Debug, Clone)]
pub struct LightingController {
    client: DeviceClient,
    config: LightingConfig,
    status: Arc<DashMap<String, DeviceStatus>>,
}

impl LightingController {
    pub fn new(config: LightingConfig) -> Result<Self> {
        Self::with_client(DeviceClient::new(), config)
    }

    /// Controller using a custom device client, e.g. one with a fake transport
    pub fn with_client(client: DeviceClient, config: LightingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            client,
            config,
            status: Arc::new(DashMap::new()),
        })
    }

    pub fn config(&self) -> &LightingConfig {
        &self.config
    }

    /// Deliver the configured look for `state` to one target
    pub async fn apply(&self, target: &LightTarget, state: EffectiveState) -> Result<ApplyOutcome> {
        let config = mapping::resolve_config(target, state);
        self.deliver(target, &config).await
    }

    /// Deliver an explicit config, bypassing the state mapping
    pub async fn preview(
        &self,
        target: &LightTarget,
        config: &StateLightConfig,
    ) -> Result<ApplyOutcome> {
        self.deliver(target, config).await
    }

    /// Deliver `state` to every target concurrently
    ///
    /// Always completes; per-target failures are reported, not propagated.
    pub async fn apply_all(&self, targets: &[LightTarget], state: EffectiveState) -> FanOutReport {
        let deliveries = targets.iter().map(|target| async move {
            TargetResult {
                target_id: target.id(),
                result: self.apply(target, state).await,
            }
        });
        let results = join_all(deliveries).await;

        let report = FanOutReport { state, results };
        for (target, error) in report.failures() {
            tracing::debug!("Failed to apply {} to {}: {}", state, target, error);
        }
        report
    }

    async fn deliver(&self, target: &LightTarget, config: &StateLightConfig) -> Result<ApplyOutcome> {
        let Some(command) = mapping::encode(target, config) else {
            tracing::trace!("State disabled for {}, leaving it untouched", target.id());
            return Ok(ApplyOutcome::Skipped);
        };

        if let LightTarget::Zone { zone, .. } = target {
            if zone.led_start > zone.led_end {
                return Err(LightingError::InvalidTarget(format!(
                    "zone {} has start {} after end {}",
                    zone.id, zone.led_start, zone.led_end
                )));
            }
        }
        let address = DeviceAddress::parse(target.address())?;

        let attempts = self.send_with_retry(&address, command).await?;
        Ok(ApplyOutcome::Applied { attempts })
    }

    async fn send_with_retry(&self, address: &DeviceAddress, command: StateCommand) -> Result<u32> {
        let operation = SetState(command);
        let max_attempts = self.config.max_attempts;
        let mut attempt = 1;

        loop {
            match self
                .client
                .execute(address, &operation, self.config.request_timeout)
                .await
            {
                Ok(()) => {
                    self.mark_online(address);
                    return Ok(attempt);
                }
                Err(e) if !e.is_retryable() => return Err(e.into()),
                Err(e) if attempt >= max_attempts => {
                    tracing::warn!(
                        "Device {} unreachable after {} attempts, marking offline: {}",
                        address,
                        attempt,
                        e
                    );
                    self.mark_offline(address, &e);
                    return Err(LightingError::Unreachable {
                        address: address.to_string(),
                        attempts: attempt,
                        last_error: e,
                    });
                }
                Err(e) => {
                    let delay = self.config.retry_delay(attempt);
                    tracing::debug!(
                        "Attempt {}/{} to {} failed, retrying in {:?}: {}",
                        attempt,
                        max_attempts,
                        address,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// One call without retry, tracking reachability
    pub(crate) async fn execute_once<Op: DeviceOperation + Sync>(
        &self,
        address: &DeviceAddress,
        operation: &Op,
        timeout: std::time::Duration,
    ) -> Result<Op::Response> {
        match self.client.execute(address, operation, timeout).await {
            Ok(response) => {
                self.mark_online(address);
                Ok(response)
            }
            Err(e) => {
                if e.is_retryable() {
                    self.mark_offline(address, &e);
                }
                Err(e.into())
            }
        }
    }

    /// Probe reachability with the short probe timeout, without retries
    pub async fn is_online(&self, address: &str) -> bool {
        let address = match DeviceAddress::parse(address) {
            Ok(address) => address,
            Err(e) => {
                tracing::debug!("Not probing {}: {}", address, e);
                return false;
            }
        };
        self.execute_once(&address, &Probe, self.config.probe_timeout)
            .await
            .is_ok()
    }

    /// Effects the device supports, keyed by their index
    pub async fn effects(&self, address: &str) -> Result<Vec<Effect>> {
        let address = DeviceAddress::parse(address)?;
        let info = self
            .execute_once(&address, &GetDeviceInfo, self.config.request_timeout)
            .await?;
        Ok(info.usable_effects())
    }

    /// The device's full current state
    pub async fn current_state(&self, address: &str) -> Result<Value> {
        let address = DeviceAddress::parse(address)?;
        let raw = self
            .execute_once(&address, &GetState, self.config.request_timeout)
            .await?;
        serde_json::from_str(&raw).map_err(|e| DeviceError::Parse(e.to_string()).into())
    }

    /// Last known status of a device, by configured or normalized address
    pub fn status(&self, address: &str) -> Option<DeviceStatus> {
        let key = DeviceAddress::parse(address).ok()?;
        self.status.get(key.as_str()).map(|entry| entry.value().clone())
    }

    /// Snapshot of every known device status, keyed by normalized address
    pub fn statuses(&self) -> HashMap<String, DeviceStatus> {
        self.status
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    fn mark_online(&self, address: &DeviceAddress) {
        let was_offline = self
            .status
            .get(address.as_str())
            .is_some_and(|status| !status.online);
        if was_offline {
            tracing::info!("Device {} is back online", address);
        }
        self.status.insert(
            address.as_str().to_string(),
            DeviceStatus {
                online: true,
                updated_at: Utc::now(),
                last_error: None,
            },
        );
    }

    fn mark_offline(&self, address: &DeviceAddress, error: &DeviceError) {
        self.status.insert(
            address.as_str().to_string(),
            DeviceStatus {
                online: false,
                updated_at: Utc::now(),
                last_error: Some(error.to_string()),
            },
        );
    }
}
