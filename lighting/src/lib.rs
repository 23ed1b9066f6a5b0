//! # lighting
//!
//! Turns effective voice states into device commands and delivers them.
//!
//! ## Architecture
//!
//! - [`model`] holds the device, zone and per-state config records
//! - [`mapping`] resolves a config for a `(target, state)` pair and encodes it
//! - [`LightingController`] delivers commands with per-target retry, tracks
//!   device reachability and fans out to many targets at once
//! - [`StateCaptureStore`] snapshots and replays a device's own state

mod capture;
mod config;
mod controller;
mod error;
pub mod mapping;
pub mod model;

pub use capture::{CapturedDeviceState, StateCaptureStore};
pub use config::LightingConfig;
pub use controller::{ApplyOutcome, DeviceStatus, FanOutReport, LightingController, TargetResult};
pub use error::{LightingError, Result};
pub use model::{Device, EffectConfig, LightTarget, StateLightConfig, Zone};
