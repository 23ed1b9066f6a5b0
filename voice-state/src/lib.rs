//! # voice-state
//!
//! Voice status acquisition for voicelight.
//!
//! ## Overview
//!
//! - [`ConnectionSupervisor`] keeps an RPC session to the voice client alive,
//!   reconnecting with exponential backoff up to a fixed budget
//! - [`VoiceStateSource`] polls the session on a fixed interval and folds
//!   push events in between polls, emitting [`VoiceAttributes`] snapshots
//! - [`StateResolver`] turns snapshots into an edge-triggered
//!   [`EffectiveState`]
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use voice_state::{ConnectionSupervisor, IpcConnector, StateResolver, VoiceConfig, VoiceEvent};
//!
//! # async fn demo() -> voice_state::Result<()> {
//! let config = VoiceConfig::new("123456789");
//! let connector = Arc::new(IpcConnector::new(&config)?);
//! let (supervisor, mut events) = ConnectionSupervisor::spawn(connector, config)?;
//! supervisor.connect()?;
//!
//! let mut resolver = StateResolver::new();
//! while let Some(event) = events.recv().await {
//!     if let VoiceEvent::AttributesObserved(attrs) = event {
//!         if let Some(change) = resolver.observe(&attrs) {
//!             println!("voice state is now {}", change.current);
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod attributes;
mod config;
mod error;
mod event;
mod resolver;
mod rpc;
mod source;
mod supervisor;

pub use attributes::VoiceAttributes;
pub use config::VoiceConfig;
pub use error::{Result, VoiceError};
pub use event::VoiceEvent;
pub use resolver::{resolve, EffectiveState, StateChange, StateResolver};
pub use rpc::{IpcConnector, RpcConnector, RpcSession, VoiceRpc};
pub use source::{SourceExit, VoiceStateSource};
pub use supervisor::{ConnectionStatus, ConnectionSupervisor};

// Re-exported so callers can configure credentials without a direct dependency
pub use rpc_client::Credentials;
