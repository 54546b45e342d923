// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event log responses from `/api/log/*`.

use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::event::{ChannelId, LogEvent};
use crate::types::parse_int;

#[derive(Debug, Default, Deserialize)]
struct EventList {
    #[serde(default)]
    events: Vec<Value>,
}

/// Parses `result.events[]` of `/api/log/caps` into event type names.
///
/// # Errors
///
/// Returns [`ApiError::UnexpectedResponse`] if the payload is not an object.
pub fn parse_log_caps(result: Value) -> Result<Vec<String>, ApiError> {
    let list: EventList = super::from_result(result)?;

    Ok(list
        .events
        .into_iter()
        .filter_map(|e| match e {
            Value::String(name) if !name.is_empty() => Some(name),
            _ => None,
        })
        .collect())
}

/// Parses `result.id` of `/api/log/subscribe`.
///
/// # Errors
///
/// Returns [`ApiError::UnexpectedResponse`] if no numeric channel id is present.
pub fn parse_subscribe(result: &Value) -> Result<ChannelId, ApiError> {
    result
        .get("id")
        .and_then(parse_int)
        .and_then(|id| u64::try_from(id).ok())
        .map(ChannelId::new)
        .ok_or_else(|| ApiError::UnexpectedResponse("subscription returned no channel id".into()))
}

/// Parses `result.events[]` of `/api/log/pull`.
///
/// Entries that are not JSON objects are dropped.
///
/// # Errors
///
/// Returns [`ApiError::UnexpectedResponse`] if the payload is not an object.
pub fn parse_pull(result: Value) -> Result<Vec<LogEvent>, ApiError> {
    let list: EventList = super::from_result(result)?;

    Ok(list
        .events
        .iter()
        .filter_map(LogEvent::from_value)
        .collect())
}
