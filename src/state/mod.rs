// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device state derived from the event log.
//!
//! [`DerivedState`] folds events into the current motion, noise, door,
//! call and switch state. [`StateStore`] shares it between the event engine
//! (single writer) and observers. [`MomentarySensor`] models the short
//! pulses raised by request-to-exit, silent alarm and rejected credentials.
//!
//! # Examples
//!
//! ```
//! use twonr_lib::event::LogEvent;
//! use twonr_lib::state::StateStore;
//!
//! let store = StateStore::new();
//! store.apply(&LogEvent::new("DoorStateChanged").with_param("state", "opened"));
//!
//! assert!(store.snapshot().door_open);
//! ```

mod derived;
mod momentary;
mod store;

pub use derived::{Applied, CallInfo, DerivedState};
pub use momentary::{MomentaryKind, MomentarySensor};
pub use store::StateStore;
