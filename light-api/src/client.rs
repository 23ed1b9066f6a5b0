use std::sync::Arc;
use std::time::Duration;

use crate::address::DeviceAddress;
use crate::error::Result;
use crate::operation::DeviceOperation;
use crate::transport::{DeviceTransport, HttpTransport};

/// Executes typed operations against devices
///
/// Cheap to clone; clones share the transport and its connection pool.
#[derive(Clone)]
pub struct DeviceClient {
    transport: Arc<dyn DeviceTransport>,
}

impl DeviceClient {
    /// Client using the HTTP transport
    pub fn new() -> Self {
        Self::with_transport(Arc::new(HttpTransport::new()))
    }

    /// Client using a custom transport
    pub fn with_transport(transport: Arc<dyn DeviceTransport>) -> Self {
        Self { transport }
    }

    /// Execute one operation with the given timeout, no retries
    pub async fn execute<Op: DeviceOperation>(
        &self,
        address: &DeviceAddress,
        operation: &Op,
        timeout: Duration,
    ) -> Result<Op::Response> {
        let request = operation.request()?;
        tracing::trace!("{:?} {}{}", request.method, address, request.path);
        let body = self.transport.send(address, &request, timeout).await?;
        Op::parse_response(&body)
    }
}

impl Default for DeviceClient {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DeviceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceClient").finish_non_exhaustive()
    }
}
