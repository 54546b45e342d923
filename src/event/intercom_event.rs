// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Notifications published by the event engine.

use serde_json::{Map, Value};

use super::LogEvent;
use crate::state::DerivedState;

/// A notification about one processed device event.
///
/// # Examples
///
/// ```
/// use twonr_lib::event::{IntercomEvent, LogEvent};
/// use twonr_lib::state::DerivedState;
///
/// let event = IntercomEvent::Received {
///     event: LogEvent::new("RexActivated"),
///     state: DerivedState::default(),
/// };
/// assert_eq!(event.name(), "RexActivated");
/// assert!(!event.is_invalid_credential());
/// ```
#[derive(Debug, Clone)]
pub enum IntercomEvent {
    /// An event as returned by the device. Every processed event produces
    /// exactly one of these.
    Received {
        /// The raw event.
        event: LogEvent,
        /// State after the event was applied.
        state: DerivedState,
    },

    /// A card, code or mobile key was rejected by the device.
    InvalidCredential {
        /// The event renamed with the `Invalid` suffix
        /// (e.g. `CardEnteredInvalid`).
        event: LogEvent,
        /// The device's event name (e.g. `CardEntered`).
        original: String,
        /// State after the event was applied.
        state: DerivedState,
    },

    /// A switch changed state.
    SwitchChanged {
        /// Switch number.
        switch: u32,
        /// Whether the switch is now active.
        active: bool,
    },
}

impl IntercomEvent {
    /// Returns the published event name.
    ///
    /// Switch changes report `SwitchStateChanged`.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Received { event, .. } | Self::InvalidCredential { event, .. } => &event.name,
            Self::SwitchChanged { .. } => super::names::SWITCH_STATE_CHANGED,
        }
    }

    /// Returns the event parameters, if the notification carries an event.
    #[must_use]
    pub fn params(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Received { event, .. } | Self::InvalidCredential { event, .. } => {
                Some(&event.params)
            }
            Self::SwitchChanged { .. } => None,
        }
    }

    /// Returns the state snapshot taken after the event.
    #[must_use]
    pub fn state(&self) -> Option<&DerivedState> {
        match self {
            Self::Received { state, .. } | Self::InvalidCredential { state, .. } => Some(state),
            Self::SwitchChanged { .. } => None,
        }
    }

    /// Returns `true` for [`IntercomEvent::InvalidCredential`].
    #[must_use]
    pub fn is_invalid_credential(&self) -> bool {
        matches!(self, Self::InvalidCredential { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_credential_accessors() {
        let raw = LogEvent::new("CodeEntered").with_param("code", "1234");
        let event = IntercomEvent::InvalidCredential {
            event: raw.renamed("CodeEnteredInvalid"),
            original: raw.name.clone(),
            state: DerivedState::default(),
        };

        assert_eq!(event.name(), "CodeEnteredInvalid");
        assert_eq!(
            event.params().and_then(|p| p.get("code")),
            Some(&Value::from("1234"))
        );
        assert!(event.state().is_some());
        assert!(event.is_invalid_credential());
    }

    #[test]
    fn switch_changed_has_no_params() {
        let event = IntercomEvent::SwitchChanged {
            switch: 2,
            active: true,
        };
        assert_eq!(event.name(), "SwitchStateChanged");
        assert!(event.params().is_none());
        assert!(event.state().is_none());
    }
}
