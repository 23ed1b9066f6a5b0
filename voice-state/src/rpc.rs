//! The seams between the voice state source and the RPC session
//!
//! `VoiceRpc` covers the queries the source issues, `RpcConnector` opens a
//! fresh session. Both are implemented for the real IPC client and can be
//! faked in tests.

use std::sync::Arc;

use async_trait::async_trait;
use rpc_client::{
    Credentials, EventKind, RpcClient, RpcEvent, SelectedVoiceChannel, VoiceSettings,
};
use tokio::sync::mpsc;

use crate::config::VoiceConfig;
use crate::error::{Result, VoiceError};

/// Queries the voice state source issues against a live session
#[async_trait]
pub trait VoiceRpc: Send + Sync {
    /// Id of the authenticated user, if any
    fn user_id(&self) -> Option<String>;

    async fn selected_voice_channel(&self) -> rpc_client::Result<Option<SelectedVoiceChannel>>;

    async fn voice_settings(&self) -> rpc_client::Result<VoiceSettings>;

    async fn subscribe(&self, kind: EventKind, channel_id: Option<&str>) -> rpc_client::Result<()>;

    async fn unsubscribe(&self, kind: EventKind, channel_id: Option<&str>)
        -> rpc_client::Result<()>;

    /// Tear the session down
    async fn close(&self);
}

#[async_trait]
impl VoiceRpc for RpcClient {
    fn user_id(&self) -> Option<String> {
        self.user().map(|user| user.id.clone())
    }

    async fn selected_voice_channel(&self) -> rpc_client::Result<Option<SelectedVoiceChannel>> {
        RpcClient::selected_voice_channel(self).await
    }

    async fn voice_settings(&self) -> rpc_client::Result<VoiceSettings> {
        RpcClient::voice_settings(self).await
    }

    async fn subscribe(&self, kind: EventKind, channel_id: Option<&str>) -> rpc_client::Result<()> {
        RpcClient::subscribe(self, kind, channel_id).await
    }

    async fn unsubscribe(
        &self,
        kind: EventKind,
        channel_id: Option<&str>,
    ) -> rpc_client::Result<()> {
        RpcClient::unsubscribe(self, kind, channel_id).await
    }

    async fn close(&self) {
        RpcClient::close(self).await
    }
}

/// A live session plus its push event stream
pub type RpcSession = (Arc<dyn VoiceRpc>, mpsc::UnboundedReceiver<RpcEvent>);

/// Opens RPC sessions for the connection supervisor
#[async_trait]
pub trait RpcConnector: Send + Sync {
    async fn connect(&self) -> rpc_client::Result<RpcSession>;
}

/// Connector for the voice client's local IPC endpoint
#[derive(Debug, Clone)]
pub struct IpcConnector {
    options: rpc_client::ClientOptions,
    credentials: Credentials,
}

impl IpcConnector {
    pub fn new(config: &VoiceConfig) -> Result<Self> {
        if config.client_id.trim().is_empty() {
            return Err(VoiceError::Configuration(
                "Client id must not be empty".to_string(),
            ));
        }

        Ok(Self {
            options: config.client_options(),
            credentials: config.credentials.clone(),
        })
    }
}

#[async_trait]
impl RpcConnector for IpcConnector {
    async fn connect(&self) -> rpc_client::Result<RpcSession> {
        let (mut client, events) = RpcClient::connect(self.options.clone()).await?;

        match client.login(&self.credentials).await {
            Ok(Some(user)) => tracing::info!("Authenticated with voice client as {}", user.username),
            Ok(None) => tracing::debug!("Voice client session is unauthenticated"),
            Err(e) => {
                client.close().await;
                return Err(e);
            }
        }

        Ok((Arc::new(client), events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ipc_connector_requires_client_id() {
        assert!(IpcConnector::new(&VoiceConfig::default()).is_err());
        assert!(IpcConnector::new(&VoiceConfig::new("123")).is_ok());
    }
}
