// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `TwoNR` Lib - A Rust library to control 2N IP intercoms.
//!
//! This library provides async APIs for the HTTP API of 2N intercoms and
//! access units.
//!
//! # Supported Features
//!
//! - **Authentication**: HTTP Digest (MD5, SHA-1, SHA-256, SHA-512,
//!   SHA-512-256 and their `-sess` variants) with one transparent
//!   re-authentication, or HTTP Basic
//! - **Device queries**: identity, switch configuration and status, camera
//!   resolutions, event capabilities
//! - **Control**: switch (relay) triggering and door release
//! - **Camera**: JPEG snapshots, MJPEG streams, RTSP URLs
//! - **Events**: a long-poll subscription kept alive in the background, with
//!   derived motion, noise, door, call and switch state
//!
//! # Quick Start
//!
//! ## One-shot requests
//!
//! ```no_run
//! use twonr_lib::Device;
//! use twonr_lib::protocol::HttpConfig;
//!
//! #[tokio::main]
//! async fn main() -> twonr_lib::Result<()> {
//!     let device = Device::connect(
//!         HttpConfig::new("192.168.1.50").with_digest_auth("admin", "2n"),
//!     )?;
//!
//!     let info = device.device_info().await?;
//!     println!("{} ({:?})", info.title, info.mac);
//!
//!     device.trigger_switch(1).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Session with events
//!
//! ```no_run
//! use twonr_lib::protocol::HttpConfig;
//! use twonr_lib::subscription::Subscribable;
//! use twonr_lib::{Session, SessionOptions};
//!
//! #[tokio::main]
//! async fn main() -> twonr_lib::Result<()> {
//!     let session = Session::connect(
//!         HttpConfig::new("192.168.1.50").with_digest_auth("admin", "2n"),
//!         SessionOptions::default(),
//!     )
//!     .await?;
//!
//!     session.on_event(|event, state| {
//!         println!("{}: motion={} door_open={}", event.name, state.motion, state.door_open);
//!     });
//!
//!     session.on_invalid_credential(|event, _| {
//!         println!("Rejected credential: {:?}", event.params);
//!     });
//!
//!     let mut events = session.subscribe();
//!     while let Ok(event) = events.recv().await {
//!         if event.name() == "CallStateChanged" {
//!             break;
//!         }
//!     }
//!
//!     session.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod auth;
mod device;
pub mod error;
pub mod event;
pub mod protocol;
pub mod response;
mod session;
pub mod state;
pub mod subscription;
pub mod types;

pub use auth::{AuthMethod, Credentials};
pub use device::Device;
pub use error::{ApiError, ChallengeError, Error, Result};
pub use event::{EngineConfig, EventEngine, IntercomEvent, LogEvent};
pub use protocol::{HttpClient, HttpConfig};
pub use response::{DeviceInfo, SwitchCapability, SwitchStatus};
pub use session::{Session, SessionOptions};
pub use state::{DerivedState, MomentaryKind};
pub use subscription::{CallbackRegistry, Subscribable, SubscriptionId};
pub use types::{CallState, MacAddress, Resolution};
