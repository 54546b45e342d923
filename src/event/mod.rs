// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device event log subscription.
//!
//! - [`LogEvent`], [`ChannelId`], [`LogInclude`]: records and handles of
//!   the `/api/log/*` endpoints
//! - [`EventEngine`]: background long-poll loop with backoff
//! - [`IntercomEvent`] and [`EventBus`]: notifications fanned out to
//!   receivers
//! - [`LogSource`]: the endpoints the engine drives, implemented by
//!   [`Device`](crate::Device)
//!
//! # Examples
//!
//! ```
//! use twonr_lib::event::{EventBus, IntercomEvent};
//!
//! let bus = EventBus::new();
//! let mut rx = bus.subscribe();
//!
//! bus.publish(IntercomEvent::SwitchChanged { switch: 1, active: false });
//! assert!(rx.try_recv().is_ok());
//! ```

mod engine;
mod event_bus;
mod intercom_event;
mod log_event;
mod source;

pub use engine::{Backoff, EngineConfig, EventEngine};
pub use event_bus::EventBus;
pub use intercom_event::IntercomEvent;
pub use log_event::{ChannelId, DEFAULT_EVENT_FILTER, LogEvent, LogInclude, names};
pub use source::LogSource;
