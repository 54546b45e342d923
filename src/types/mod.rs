// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types for 2N device data.
//!
//! # Types
//!
//! - [`MacAddress`] - Canonical MAC address
//! - [`CallState`] - Call progress reported by `CallStateChanged`
//! - [`Resolution`] - Camera image size, with [`select_resolution`]
//! - [`CameraSource`] - Internal or external camera
//!
//! The [`parse_flag`], [`parse_int`] and [`parse_text`] helpers read loosely
//! typed event parameters.

mod call_state;
mod flag;
mod mac;
mod resolution;

pub use call_state::CallState;
pub use flag::{parse_flag, parse_int, parse_text};
pub use mac::MacAddress;
pub use resolution::{CameraSource, Resolution, select_resolution};
