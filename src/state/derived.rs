// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! State folded from the device event log.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::event::{LogEvent, names};
use crate::types::{CallState, parse_flag, parse_int, parse_text};

/// Metadata of the current or last call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CallInfo {
    /// Call progress.
    pub state: CallState,
    /// `incoming` or `outgoing`.
    pub direction: Option<String>,
    /// Remote party (SIP URI or phone number).
    pub peer: Option<String>,
    /// Device-side session number.
    pub session: Option<i64>,
    /// Device-side call number within the session.
    pub call_id: Option<i64>,
}

/// Current device state derived from the events processed so far.
///
/// Each field reflects only the latest event of its category.
///
/// # Examples
///
/// ```
/// use twonr_lib::event::LogEvent;
/// use twonr_lib::state::DerivedState;
///
/// let mut state = DerivedState::new();
/// state.apply(&LogEvent::new("MotionDetected").with_param("state", "in"));
/// assert!(state.motion);
///
/// state.apply(&LogEvent::new("MotionDetected").with_param("state", "out"));
/// assert!(!state.motion);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DerivedState {
    /// Motion detector active.
    pub motion: bool,
    /// Noise detector active.
    pub noise: bool,
    /// Door contact open.
    pub door_open: bool,
    /// Call progress and metadata.
    pub call: CallInfo,
    /// Switch activity keyed by switch id.
    pub switches: BTreeMap<u32, bool>,
    /// Last event processed, whatever its type.
    pub last_event: Option<LogEvent>,
    /// Last credential event rejected by the device, renamed with the
    /// `Invalid` suffix.
    pub last_invalid: Option<LogEvent>,
}

/// Side effects of applying one event, beyond the state fields themselves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Applied {
    /// The renamed event, when a credential was rejected.
    pub invalid: Option<LogEvent>,
    /// Switch id and new activity, when a switch changed.
    pub switch: Option<(u32, bool)>,
}

impl DerivedState {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether a switch is active, `None` if it was never seen.
    #[must_use]
    pub fn switch_active(&self, switch: u32) -> Option<bool> {
        self.switches.get(&switch).copied()
    }

    /// Replaces the switch map with a fresh reading.
    pub fn seed_switches(&mut self, switches: impl IntoIterator<Item = (u32, bool)>) {
        self.switches = switches.into_iter().collect();
    }

    /// Folds one event into the state.
    ///
    /// Unknown event types only update [`last_event`](Self::last_event).
    pub fn apply(&mut self, event: &LogEvent) -> Applied {
        let mut applied = Applied::default();
        self.last_event = Some(event.clone());

        match event.name.as_str() {
            names::MOTION_DETECTED => {
                self.motion = event.param_str("state").as_deref() == Some("in");
            }
            names::NOISE_DETECTED => {
                self.noise = event.param_str("state").as_deref() == Some("in");
            }
            names::DOOR_STATE_CHANGED => {
                self.door_open = event.param_str("state").as_deref() == Some("opened");
            }
            names::CALL_STATE_CHANGED => {
                self.call = CallInfo {
                    state: CallState::parse(&event.param_str("state").unwrap_or_default()),
                    direction: event.param("direction").and_then(parse_text),
                    peer: event.param("peer").and_then(parse_text),
                    session: event.param("session").and_then(parse_int),
                    call_id: event.param("call").and_then(parse_int),
                };
            }
            names::SWITCH_STATE_CHANGED => {
                let id = event
                    .param("switch")
                    .and_then(parse_int)
                    .and_then(|id| u32::try_from(id).ok());
                let active = event.param("state").and_then(parse_flag);
                if let (Some(id), Some(active)) = (id, active) {
                    self.switches.insert(id, active);
                    applied.switch = Some((id, active));
                }
            }
            _ if event.is_credential() => {
                if event.param("valid").and_then(parse_flag) == Some(false) {
                    let invalid =
                        event.renamed(format!("{}{}", event.name, names::INVALID_SUFFIX));
                    self.last_invalid = Some(invalid.clone());
                    applied.invalid = Some(invalid);
                }
            }
            _ => {}
        }

        applied
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn event(name: &str) -> LogEvent {
        LogEvent::new(name)
    }

    #[test]
    fn motion_last_write_wins() {
        let mut state = DerivedState::new();
        state.apply(&event("MotionDetected").with_param("state", "in"));
        state.apply(&event("MotionDetected").with_param("state", "out"));
        assert!(!state.motion);

        state.apply(&event("MotionDetected").with_param("state", "out"));
        state.apply(&event("MotionDetected").with_param("state", "In"));
        assert!(state.motion);
    }

    #[test]
    fn motion_other_value_is_false() {
        let mut state = DerivedState::new();
        state.apply(&event("MotionDetected").with_param("state", "in"));
        state.apply(&event("MotionDetected").with_param("state", "unknown"));
        assert!(!state.motion);
    }

    #[test]
    fn noise_and_door() {
        let mut state = DerivedState::new();
        state.apply(&event("NoiseDetected").with_param("state", "in"));
        state.apply(&event("DoorStateChanged").with_param("state", "opened"));
        assert!(state.noise);
        assert!(state.door_open);

        state.apply(&event("DoorStateChanged").with_param("state", "closed"));
        assert!(!state.door_open);
        assert!(state.noise);
    }

    #[test]
    fn call_state_with_metadata() {
        let mut state = DerivedState::new();
        state.apply(
            &event("CallStateChanged")
                .with_param("state", "Ringing")
                .with_param("direction", "incoming")
                .with_param("peer", "sip:100@10.0.0.2")
                .with_param("session", 3)
                .with_param("call", "7"),
        );

        assert_eq!(state.call.state, CallState::Ringing);
        assert_eq!(state.call.direction.as_deref(), Some("incoming"));
        assert_eq!(state.call.peer.as_deref(), Some("sip:100@10.0.0.2"));
        assert_eq!(state.call.session, Some(3));
        assert_eq!(state.call.call_id, Some(7));
    }

    #[test]
    fn call_terminated_is_idle_and_clears_metadata() {
        let mut state = DerivedState::new();
        state.apply(
            &event("CallStateChanged")
                .with_param("state", "connected")
                .with_param("session", 3),
        );
        state.apply(&event("CallStateChanged").with_param("state", "terminated"));

        assert_eq!(state.call.state, CallState::Idle);
        assert_eq!(state.call.session, None);
    }

    #[test]
    fn call_session_not_numeric() {
        let mut state = DerivedState::new();
        state.apply(
            &event("CallStateChanged")
                .with_param("state", "dialing")
                .with_param("session", "abc"),
        );
        assert_eq!(state.call.state, CallState::Dialing);
        assert_eq!(state.call.session, None);
    }

    #[test]
    fn switch_state_updates_map() {
        let mut state = DerivedState::new();
        state.seed_switches([(1, false), (2, false)]);

        let applied = state.apply(
            &event("SwitchStateChanged")
                .with_param("switch", 1)
                .with_param("state", "on"),
        );
        assert_eq!(applied.switch, Some((1, true)));
        assert_eq!(state.switch_active(1), Some(true));
        assert_eq!(state.switch_active(2), Some(false));
    }

    #[test]
    fn switch_state_indeterminate_is_ignored() {
        let mut state = DerivedState::new();
        state.seed_switches([(1, true)]);

        let applied = state.apply(
            &event("SwitchStateChanged")
                .with_param("switch", 1)
                .with_param("state", "maybe"),
        );
        assert_eq!(applied.switch, None);
        assert_eq!(state.switch_active(1), Some(true));

        let applied = state.apply(&event("SwitchStateChanged").with_param("state", true));
        assert_eq!(applied.switch, None);
    }

    #[test]
    fn invalid_credential_forms() {
        for valid in [json!(false), json!("false"), json!(0), json!("no")] {
            let mut state = DerivedState::new();
            let applied = state.apply(
                &event("CardEntered")
                    .with_id(5)
                    .with_param("valid", valid.clone())
                    .with_param("uid", "0A1B2C"),
            );

            let invalid = applied.invalid.unwrap_or_else(|| panic!("{valid} not invalid"));
            assert_eq!(invalid.name, "CardEnteredInvalid");
            assert_eq!(invalid.id, Some(5));
            assert_eq!(state.last_invalid.as_ref(), Some(&invalid));
            assert_eq!(state.last_event.as_ref().map(|e| e.name.as_str()), Some("CardEntered"));
        }
    }

    #[test]
    fn valid_credential_is_not_republished() {
        for valid in [json!(true), json!("true")] {
            let mut state = DerivedState::new();
            let applied = state.apply(&event("CodeEntered").with_param("valid", valid));
            assert_eq!(applied.invalid, None);
            assert!(state.last_invalid.is_none());
            assert!(state.last_event.is_some());
        }
    }

    #[test]
    fn credential_without_flag_is_not_invalid() {
        let mut state = DerivedState::new();
        let applied = state.apply(&event("MobKeyEntered"));
        assert_eq!(applied, Applied::default());
    }

    #[test]
    fn unknown_event_only_sets_last_event() {
        let mut state = DerivedState::new();
        state.apply(&event("KeyPressed").with_param("key", "1"));

        let expected = DerivedState {
            last_event: Some(event("KeyPressed").with_param("key", "1")),
            ..DerivedState::default()
        };
        assert_eq!(state, expected);
    }
}
