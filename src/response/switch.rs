// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Switch (relay) responses from `/api/switch/caps` and `/api/switch/status`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;
use crate::types::{parse_flag, parse_int, parse_text};

/// Static configuration of one switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwitchCapability {
    /// Switch number, unique per device.
    pub id: u32,
    /// Whether the switch is enabled in the device configuration.
    pub enabled: bool,
    /// Switch mode (`monostable`, `bistable`).
    pub mode: Option<String>,
    /// Activation time in seconds for monostable switches.
    pub switch_on_duration: Option<u32>,
    /// Switch type (`normal`, `inverted`, `security`).
    pub kind: Option<String>,
}

/// Current state of one switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwitchStatus {
    /// Switch number.
    pub id: u32,
    /// Whether the switch is currently active.
    pub active: bool,
    /// Whether the switch is locked.
    pub locked: Option<bool>,
    /// Whether the switch is held active.
    pub held: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct SwitchList {
    #[serde(default)]
    switches: Vec<Value>,
}

fn switch_id(item: &Value) -> Option<u32> {
    item.get("switch")
        .and_then(parse_int)
        .and_then(|id| u32::try_from(id).ok())
}

/// Parses `result.switches[]` of `/api/switch/caps`.
///
/// Entries without a numeric switch id are skipped.
///
/// # Errors
///
/// Returns [`ApiError::UnexpectedResponse`] if the payload has no switch list.
pub fn parse_switch_caps(result: Value) -> Result<Vec<SwitchCapability>, ApiError> {
    let list: SwitchList = super::from_result(result)?;

    Ok(list
        .switches
        .iter()
        .filter_map(|item| {
            let Some(id) = switch_id(item) else {
                tracing::debug!(entry = %item, "Skipping switch entry without id");
                return None;
            };
            Some(SwitchCapability {
                id,
                enabled: item.get("enabled").and_then(parse_flag).unwrap_or(false),
                mode: item.get("mode").and_then(parse_text),
                switch_on_duration: item
                    .get("switchOnDuration")
                    .and_then(parse_int)
                    .and_then(|d| u32::try_from(d).ok()),
                kind: item.get("type").and_then(parse_text),
            })
        })
        .collect())
}

/// Parses `result.switches[]` of `/api/switch/status`.
///
/// # Errors
///
/// Returns [`ApiError::UnexpectedResponse`] if the payload has no switch list.
pub fn parse_switch_status(result: Value) -> Result<Vec<SwitchStatus>, ApiError> {
    let list: SwitchList = super::from_result(result)?;

    Ok(list
        .switches
        .iter()
        .filter_map(|item| {
            Some(SwitchStatus {
                id: switch_id(item)?,
                active: item.get("active").and_then(parse_flag).unwrap_or(false),
                locked: item.get("locked").and_then(parse_flag),
                held: item.get("held").and_then(parse_flag),
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn caps_are_parsed_and_invalid_entries_skipped() {
        let caps = parse_switch_caps(json!({
            "switches": [
                {"switch": 1, "enabled": true, "mode": "monostable", "switchOnDuration": 5, "type": "normal"},
                {"switch": "2", "enabled": false},
                {"switch": "relay", "enabled": true},
                {"enabled": true}
            ]
        }))
        .unwrap();

        assert_eq!(caps.len(), 2);
        assert_eq!(
            caps[0],
            SwitchCapability {
                id: 1,
                enabled: true,
                mode: Some("monostable".to_string()),
                switch_on_duration: Some(5),
                kind: Some("normal".to_string()),
            }
        );
        assert_eq!(caps[1].id, 2);
        assert!(!caps[1].enabled);
    }

    #[test]
    fn status_is_parsed() {
        let status = parse_switch_status(json!({
            "switches": [
                {"switch": 1, "active": true, "locked": false, "held": false},
                {"switch": 2, "active": false}
            ]
        }))
        .unwrap();

        assert_eq!(status.len(), 2);
        assert!(status[0].active);
        assert_eq!(status[0].locked, Some(false));
        assert_eq!(status[1].held, None);
    }

    #[test]
    fn missing_list_is_empty() {
        assert!(parse_switch_status(json!({})).unwrap().is_empty());
    }
}
