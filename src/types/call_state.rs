// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Call states reported by `CallStateChanged` events.

use std::fmt;

use serde::{Serialize, Serializer};

/// State of the intercom's current call.
///
/// The device reports `terminated` when a call ends; it is collapsed into
/// [`CallState::Idle`] so the state settles back to its resting value.
///
/// # Examples
///
/// ```
/// use twonr_lib::types::CallState;
///
/// assert_eq!(CallState::parse("Ringing"), CallState::Ringing);
/// assert_eq!(CallState::parse("terminated"), CallState::Idle);
/// assert_eq!(CallState::parse(""), CallState::Idle);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum CallState {
    /// No call in progress.
    #[default]
    Idle,
    /// An outgoing call is being dialed.
    Dialing,
    /// The call is being set up.
    Connecting,
    /// The remote side is ringing.
    Ringing,
    /// The call is established.
    Connected,
    /// The call is on hold.
    Holding,
    /// A state not known to this library, lowercased.
    Other(String),
}

impl CallState {
    /// Parses a device call state (case-insensitive).
    #[must_use]
    pub fn parse(state: &str) -> Self {
        match state.trim().to_ascii_lowercase().as_str() {
            "" | "idle" | "terminated" => Self::Idle,
            "dialing" => Self::Dialing,
            "connecting" => Self::Connecting,
            "ringing" => Self::Ringing,
            "connected" => Self::Connected,
            "holding" => Self::Holding,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns the lowercase state name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Idle => "idle",
            Self::Dialing => "dialing",
            Self::Connecting => "connecting",
            Self::Ringing => "ringing",
            Self::Connected => "connected",
            Self::Holding => "holding",
            Self::Other(s) => s,
        }
    }

    /// Returns `true` unless the state is [`CallState::Idle`].
    #[must_use]
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CallState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
