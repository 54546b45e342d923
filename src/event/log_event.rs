// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event log records and subscription channel types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::types::parse_int;

/// Well-known event type names.
pub mod names {
    /// Motion detector state change (`state`: `in`/`out`).
    pub const MOTION_DETECTED: &str = "MotionDetected";
    /// Noise detector state change (`state`: `in`/`out`).
    pub const NOISE_DETECTED: &str = "NoiseDetected";
    /// Door contact change (`state`: `opened`/`closed`).
    pub const DOOR_STATE_CHANGED: &str = "DoorStateChanged";
    /// Call progress change.
    pub const CALL_STATE_CHANGED: &str = "CallStateChanged";
    /// Relay activation change.
    pub const SWITCH_STATE_CHANGED: &str = "SwitchStateChanged";
    /// Request-to-exit button pressed.
    pub const REX_ACTIVATED: &str = "RexActivated";
    /// Silent alarm raised.
    pub const SILENT_ALARM: &str = "SilentAlarm";
    /// RFID card presented.
    pub const CARD_ENTERED: &str = "CardEntered";
    /// Keypad code entered.
    pub const CODE_ENTERED: &str = "CodeEntered";
    /// Mobile key (Bluetooth) presented.
    pub const MOB_KEY_ENTERED: &str = "MobKeyEntered";

    /// Events carrying a `valid` credential flag.
    pub const CREDENTIAL_EVENTS: [&str; 3] = [CARD_ENTERED, CODE_ENTERED, MOB_KEY_ENTERED];

    /// Suffix appended to credential events whose `valid` flag is false.
    pub const INVALID_SUFFIX: &str = "Invalid";
}

/// Event types subscribed to when the device does not narrow the list.
pub const DEFAULT_EVENT_FILTER: [&str; 10] = [
    names::CALL_STATE_CHANGED,
    names::MOTION_DETECTED,
    names::DOOR_STATE_CHANGED,
    names::SWITCH_STATE_CHANGED,
    names::REX_ACTIVATED,
    names::NOISE_DETECTED,
    names::SILENT_ALARM,
    names::CARD_ENTERED,
    names::CODE_ENTERED,
    names::MOB_KEY_ENTERED,
];

/// Identifier of a device-side event subscription queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ChannelId(u64);

impl ChannelId {
    /// Wraps a raw channel id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw channel id.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which stored events a new subscription starts with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogInclude {
    /// Only events raised after the subscription is created.
    #[default]
    New,
    /// Every event still held in the device log.
    All,
    /// Events raised in the given number of seconds before subscribing.
    Since(u32),
}

impl LogInclude {
    /// Returns the `include` query parameter value.
    #[must_use]
    pub fn to_query_value(self) -> String {
        match self {
            Self::New => "new".to_string(),
            Self::All => "all".to_string(),
            Self::Since(seconds) => format!("-{seconds}"),
        }
    }
}

/// One record returned by `/api/log/pull`.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use twonr_lib::event::LogEvent;
///
/// let event = LogEvent::from_value(&json!({
///     "id": 12,
///     "utcTime": 1700000000,
///     "upTime": 3600,
///     "event": "DoorStateChanged",
///     "params": {"door": 1, "state": "opened"}
/// }))
/// .unwrap();
///
/// assert_eq!(event.name, "DoorStateChanged");
/// assert_eq!(event.param_str("state").as_deref(), Some("opened"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEvent {
    /// Sequence number assigned by the device.
    pub id: Option<u64>,
    /// Event type name.
    #[serde(rename = "event")]
    pub name: String,
    /// Wall-clock time of the event.
    #[serde(rename = "utcTime")]
    pub utc_time: Option<DateTime<Utc>>,
    /// Device uptime in seconds when the event was raised.
    #[serde(rename = "upTime")]
    pub up_time: Option<u64>,
    /// Event specific parameters.
    pub params: Map<String, Value>,
}

impl LogEvent {
    /// Creates an event with the given name and no parameters.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            utc_time: None,
            up_time: None,
            params: Map::new(),
        }
    }

    /// Sets the sequence number.
    #[must_use]
    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Reads a record from its JSON form.
    ///
    /// Returns `None` if `value` is not an object. Missing or malformed
    /// fields are tolerated: the name defaults to empty and a non-object
    /// `params` is treated as empty.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;

        let name = match obj.get("event") {
            Some(Value::String(s)) => s.clone(),
            _ => String::new(),
        };
        let params = match obj.get("params") {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        };

        Some(Self {
            id: obj
                .get("id")
                .and_then(parse_int)
                .and_then(|id| u64::try_from(id).ok()),
            name,
            utc_time: obj
                .get("utcTime")
                .and_then(parse_int)
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
            up_time: obj
                .get("upTime")
                .and_then(parse_int)
                .and_then(|t| u64::try_from(t).ok()),
            params,
        })
    }

    /// Returns a parameter value.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    /// Returns a scalar parameter as lowercase text.
    #[must_use]
    pub fn param_str(&self, key: &str) -> Option<String> {
        self.param(key)
            .and_then(crate::types::parse_text)
            .map(|s| s.to_lowercase())
    }

    /// Returns a copy of this event carrying another name.
    #[must_use]
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    /// Returns `true` for card, code and mobile key events.
    #[must_use]
    pub fn is_credential(&self) -> bool {
        names::CREDENTIAL_EVENTS.contains(&self.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn from_value_tolerates_missing_fields() {
        let event = LogEvent::from_value(&json!({"params": "oops"})).unwrap();
        assert_eq!(event.name, "");
        assert!(event.params.is_empty());
        assert!(event.id.is_none());
        assert!(event.utc_time.is_none());
    }

    #[test]
    fn from_value_rejects_non_objects() {
        assert!(LogEvent::from_value(&json!([1, 2])).is_none());
    }

    #[test]
    fn utc_time_is_unix_seconds() {
        let event = LogEvent::from_value(&json!({"event": "X", "utcTime": 0})).unwrap();
        assert_eq!(event.utc_time, DateTime::from_timestamp(0, 0));
    }

    #[test]
    fn serializes_with_device_field_names() {
        let event = LogEvent::new("RexActivated").with_id(3);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "RexActivated");
        assert_eq!(value["id"], 3);
        assert!(value.get("upTime").is_some());
    }

    #[test]
    fn renamed_keeps_payload() {
        let event = LogEvent::new("CardEntered")
            .with_id(9)
            .with_param("valid", false);
        let renamed = event.renamed("CardEnteredInvalid");
        assert_eq!(renamed.name, "CardEnteredInvalid");
        assert_eq!(renamed.id, Some(9));
        assert_eq!(renamed.params, event.params);
    }

    #[test]
    fn credential_events() {
        assert!(LogEvent::new("MobKeyEntered").is_credential());
        assert!(!LogEvent::new("MotionDetected").is_credential());
    }

    #[test]
    fn include_query_values() {
        assert_eq!(LogInclude::New.to_query_value(), "new");
        assert_eq!(LogInclude::All.to_query_value(), "all");
        assert_eq!(LogInclude::Since(60).to_query_value(), "-60");
    }
}
