//! Scripted device transport for delivery tests

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use light_api::{DeviceAddress, DeviceClient, DeviceError, DeviceRequest, DeviceTransport};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::time::Instant;

/// One request seen by the transport
#[derive(Debug, Clone)]
pub struct Call {
    pub address: String,
    pub request: DeviceRequest,
    pub at: Instant,
}

impl Call {
    pub fn body_json(&self) -> Value {
        serde_json::from_str(self.request.body.as_deref().unwrap_or("null")).unwrap()
    }
}

/// Replays scripted replies per device; unscripted calls succeed
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<Result<String, DeviceError>>>>,
    broken: Mutex<HashSet<String>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn client(self: &Arc<Self>) -> DeviceClient {
        DeviceClient::with_transport(self.clone())
    }

    /// Queue replies for a device, given by the address as configured
    pub fn script(&self, address: &str, replies: Vec<Result<String, DeviceError>>) {
        let key = DeviceAddress::parse(address).unwrap().to_string();
        self.scripts.lock().entry(key).or_default().extend(replies);
    }

    /// Make every call to a device fail with HTTP 500
    pub fn break_device(&self, address: &str) {
        let key = DeviceAddress::parse(address).unwrap().to_string();
        self.broken.lock().insert(key);
    }

    pub fn repair_device(&self, address: &str) {
        let key = DeviceAddress::parse(address).unwrap().to_string();
        self.broken.lock().remove(&key);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn calls_to(&self, address: &str) -> Vec<Call> {
        let key = DeviceAddress::parse(address).unwrap().to_string();
        self.calls
            .lock()
            .iter()
            .filter(|c| c.address == key)
            .cloned()
            .collect()
    }

    /// Time between consecutive calls to one device
    pub fn gaps(&self, address: &str) -> Vec<Duration> {
        self.calls_to(address)
            .windows(2)
            .map(|w| w[1].at - w[0].at)
            .collect()
    }
}

#[async_trait]
impl DeviceTransport for ScriptedTransport {
    async fn send(
        &self,
        address: &DeviceAddress,
        request: &DeviceRequest,
        _timeout: Duration,
    ) -> Result<String, DeviceError> {
        let key = address.to_string();
        self.calls.lock().push(Call {
            address: key.clone(),
            request: request.clone(),
            at: Instant::now(),
        });

        if self.broken.lock().contains(&key) {
            return Err(DeviceError::Status(500));
        }
        let scripted = self.scripts.lock().get_mut(&key).and_then(VecDeque::pop_front);
        scripted.unwrap_or_else(|| Ok(r#"{"success":true}"#.to_string()))
    }
}
