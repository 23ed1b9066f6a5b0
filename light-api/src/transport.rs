//! Moving requests to devices

use std::time::Duration;

use async_trait::async_trait;

use crate::address::DeviceAddress;
use crate::error::{DeviceError, Result};
use crate::operation::{DeviceRequest, Method};

/// Sends a built request to a device and returns the reply body
#[async_trait]
pub trait DeviceTransport: Send + Sync {
    async fn send(
        &self,
        address: &DeviceAddress,
        request: &DeviceRequest,
        timeout: Duration,
    ) -> Result<String>;
}

/// HTTP transport backed by a shared `reqwest` client
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DeviceTransport for HttpTransport {
    async fn send(
        &self,
        address: &DeviceAddress,
        request: &DeviceRequest,
        timeout: Duration,
    ) -> Result<String> {
        let url = address.url(request.path);
        let builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        let builder = match &request.body {
            Some(body) => builder
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body.clone()),
            None => builder,
        };

        let response = builder
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeviceError::Status(status.as_u16()));
        }

        response.text().await.map_err(|e| classify(&url, e))
    }
}

fn classify(url: &str, error: reqwest::Error) -> DeviceError {
    if error.is_timeout() {
        DeviceError::Timeout(url.to_string())
    } else {
        DeviceError::Network(error.to_string())
    }
}
