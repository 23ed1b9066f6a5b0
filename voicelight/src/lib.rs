//! # voicelight
//!
//! Keeps LED devices in sync with your voice-chat status.
//!
//! ## Overview
//!
//! The voice client's local RPC endpoint is polled and listened to; every
//! snapshot is resolved to one [`EffectiveState`](voice_state::EffectiveState)
//! (idle, connected, speaking, muted, deafened or streaming). When that state
//! changes, every configured device and zone receives the color, brightness
//! and effect configured for it.
//!
//! ## Architecture
//!
//! - `voice-state` owns the RPC session, reconnects and resolves states
//! - `lighting` maps states to device commands and delivers them
//! - this crate wires the two together behind [`VoiceLight`] and reports
//!   what happened as [`Notification`]s
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use voicelight::prelude::*;
//!
//! # async fn demo() -> voicelight::Result<()> {
//! let device = Device::new("desk", "192.168.1.50");
//! let targets = Arc::new(InMemoryTargets::new(vec![device], Vec::new()));
//!
//! let config = VoiceLightConfig::new(VoiceConfig::new("123456789"));
//! let (app, mut notifications) = VoiceLight::start(config, targets).await?;
//!
//! while let Some(notification) = notifications.recv().await {
//!     println!("{:?}", notification);
//! }
//! app.shutdown().await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
pub mod logging;
mod notification;
mod orchestrator;
mod system;
mod targets;

pub use config::VoiceLightConfig;
pub use error::{Result, VoiceLightError};
pub use notification::Notification;
pub use orchestrator::Orchestrator;
pub use system::VoiceLight;
pub use targets::{InMemoryTargets, TargetProvider};

/// The types most applications need
pub mod prelude {
    pub use crate::{
        InMemoryTargets, Notification, TargetProvider, VoiceLight, VoiceLightConfig,
        VoiceLightError,
    };
    pub use light_api::Rgb;
    pub use lighting::{Device, EffectConfig, LightingConfig, StateLightConfig, Zone};
    pub use voice_state::{ConnectionStatus, Credentials, EffectiveState, VoiceConfig};
}
