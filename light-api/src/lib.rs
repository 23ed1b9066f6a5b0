//! Type-safe API for HTTP-controlled addressable LED devices
//!
//! Devices expose a small JSON API: `POST /json/state` sets color, brightness
//! and effect, `GET /json/state` returns the full current state, `GET /json`
//! adds the effect list and `GET /json/info` is cheap enough to probe with.
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use light_api::{DeviceAddress, DeviceClient, Rgb, Segment, SetState, StateCommand};
//!
//! # async fn demo() -> light_api::Result<()> {
//! let client = DeviceClient::new();
//! let address = DeviceAddress::parse("192.168.1.40")?;
//! let command = StateCommand {
//!     on: true,
//!     bri: 128,
//!     seg: Segment::solid(Rgb::new(0, 255, 0)),
//!     transition: None,
//! };
//! client.execute(&address, &SetState(command), Duration::from_secs(5)).await?;
//! # Ok(())
//! # }
//! ```

mod address;
mod client;
mod color;
mod error;
pub mod operation;
mod transport;
mod wire;

pub use address::DeviceAddress;
pub use client::DeviceClient;
pub use color::Rgb;
pub use error::{DeviceError, Result};
pub use operation::{
    DeviceOperation, DeviceRequest, GetDeviceInfo, GetState, Method, Probe, RestoreState, SetState,
};
pub use transport::{DeviceTransport, HttpTransport};
pub use wire::{DeviceInfo, Effect, ProbeInfo, Segment, StateCommand, DEFAULT_EFFECT_LEVEL};
