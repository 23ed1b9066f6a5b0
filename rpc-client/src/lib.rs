//! Private RPC client for talking to a locally running voice-chat client
//!
//! This crate provides a minimal client for the voice client's local IPC
//! socket: frame encoding, the handshake, nonce-correlated requests, push
//! event dispatch and the OAuth2 authorization-code flow.
//!
//! ```rust,no_run
//! use rpc_client::{ClientOptions, EventKind, RpcClient};
//!
//! # async fn demo() -> Result<(), rpc_client::RpcError> {
//! let (client, mut events) = RpcClient::connect(ClientOptions::new("123456789")).await?;
//! client.subscribe(EventKind::VoiceSettingsUpdate, None).await?;
//!
//! let settings = client.voice_settings().await?;
//! println!("muted: {}", settings.mute);
//!
//! while let Some(event) = events.recv().await {
//!     println!("{:?}", event);
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
pub mod frame;
mod oauth;
pub mod transport;
mod types;

pub use client::{ClientOptions, RpcClient, RPC_VERSION};
pub use error::{Result, RpcError, INVALID_CHANNEL, NOT_AUTHENTICATED};
pub use oauth::{exchange_code, Credentials, TokenResponse, DEFAULT_SCOPES, DEFAULT_TOKEN_URL};
pub use types::{
    ChannelMember, EventKind, MemberVoiceState, RpcEvent, SelectedVoiceChannel, User,
    VoiceSettings,
};
