//! Capture and restore of a device's own state
//!
//! Independent of the voice-state mapping: a capture is the device's raw
//! `GET /json/state` body, replayed verbatim on restore.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use light_api::{DeviceAddress, GetState, RestoreState};

use crate::controller::LightingController;
use crate::error::{LightingError, Result};
use crate::model::Device;

/// A device's state as it was before the application touched it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedDeviceState {
    pub device_id: String,
    pub address: String,
    pub captured_at: DateTime<Utc>,
    /// Exact body returned by the device
    pub raw_state: String,
}

/// At most one live capture per device; a new capture replaces the old one
#[derive(Debug, Clone)]
pub struct StateCaptureStore {
    controller: LightingController,
    captures: Arc<DashMap<String, CapturedDeviceState>>,
}

impl StateCaptureStore {
    pub fn new(controller: LightingController) -> Self {
        Self {
            controller,
            captures: Arc::new(DashMap::new()),
        }
    }

    /// Read and store the device's current state
    pub async fn capture(&self, device_id: &str, address: &str) -> Result<CapturedDeviceState> {
        let parsed = DeviceAddress::parse(address)?;
        let raw_state = self
            .controller
            .execute_once(&parsed, &GetState, self.controller.config().request_timeout)
            .await?;

        let captured = CapturedDeviceState {
            device_id: device_id.to_string(),
            address: address.to_string(),
            captured_at: Utc::now(),
            raw_state,
        };
        tracing::debug!("Captured state of device {} ({} bytes)", device_id, captured.raw_state.len());
        self.captures.insert(device_id.to_string(), captured.clone());
        Ok(captured)
    }

    /// Post the stored snapshot back to the device
    ///
    /// The snapshot stays in the store, so a restore can be repeated.
    pub async fn restore(&self, device_id: &str) -> Result<()> {
        let captured = self
            .get(device_id)
            .ok_or_else(|| LightingError::NoSnapshot(device_id.to_string()))?;
        let address = DeviceAddress::parse(&captured.address)?;

        self.controller
            .execute_once(
                &address,
                &RestoreState(captured.raw_state),
                self.controller.config().request_timeout,
            )
            .await?;
        tracing::debug!("Restored state of device {}", device_id);
        Ok(())
    }

    /// Capture every device concurrently; failures do not affect siblings
    pub async fn capture_all(&self, devices: &[Device]) -> Vec<(String, Result<CapturedDeviceState>)> {
        let captures = devices.iter().map(|device| async move {
            (
                device.id.clone(),
                self.capture(&device.id, &device.address).await,
            )
        });
        futures::future::join_all(captures).await
    }

    /// Restore every captured device concurrently
    pub async fn restore_all(&self) -> Vec<(String, Result<()>)> {
        let restores = self.captured_ids().into_iter().map(|id| async move {
            let result = self.restore(&id).await;
            (id, result)
        });
        futures::future::join_all(restores).await
    }

    pub fn get(&self, device_id: &str) -> Option<CapturedDeviceState> {
        self.captures.get(device_id).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, device_id: &str) -> Option<CapturedDeviceState> {
        self.captures.remove(device_id).map(|(_, captured)| captured)
    }

    /// Ids of devices with a live capture, sorted
    pub fn captured_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.captures.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids
    }
}
