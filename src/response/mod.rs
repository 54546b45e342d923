// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Response parsing for the 2N HTTP API.
//!
//! Every JSON response is wrapped in an envelope:
//!
//! ```json
//! { "success": true, "result": { ... } }
//! { "success": false, "error": { "code": 12, "description": "..." } }
//! ```
//!
//! [`unwrap_envelope`] validates the envelope and returns the `result`
//! payload, which the typed parsers in this module turn into domain values.

mod camera;
mod log;
mod switch;
mod system;

pub use camera::parse_camera_caps;
pub use log::{parse_log_caps, parse_pull, parse_subscribe};
pub use switch::{SwitchCapability, SwitchStatus, parse_switch_caps, parse_switch_status};
pub use system::DeviceInfo;

use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
struct Envelope {
    success: Option<bool>,
    #[serde(default)]
    result: Value,
    error: Option<DeviceErrorBody>,
}

#[derive(Debug, Deserialize)]
struct DeviceErrorBody {
    code: Option<i64>,
    #[serde(default)]
    param: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Validates a JSON envelope and returns its `result` payload.
///
/// A response without `result` (such as a switch trigger acknowledgement)
/// yields [`Value::Null`].
///
/// # Errors
///
/// - [`ApiError::UnexpectedResponse`] if the body is not JSON or the
///   `success` flag is absent or false without an error object
/// - [`ApiError::Device`] if the device reported an error object
///
/// # Examples
///
/// ```
/// use twonr_lib::response::unwrap_envelope;
///
/// let result = unwrap_envelope(r#"{"success": true, "result": {"id": 7}}"#).unwrap();
/// assert_eq!(result["id"], 7);
///
/// assert!(unwrap_envelope(r#"{"result": {}}"#).is_err());
/// ```
pub fn unwrap_envelope(body: &str) -> Result<Value, ApiError> {
    let envelope: Envelope = serde_json::from_str(body)?;

    match envelope.success {
        Some(true) => Ok(envelope.result),
        Some(false) => match envelope.error {
            Some(error) => {
                let mut description = error.description.unwrap_or_default();
                if let Some(param) = error.param {
                    description = format!("{description} (param: {param})");
                }
                Err(ApiError::Device {
                    code: error.code,
                    description,
                })
            }
            None => Err(ApiError::UnexpectedResponse(
                "device reported success: false".to_string(),
            )),
        },
        None => Err(ApiError::UnexpectedResponse(
            "missing success flag".to_string(),
        )),
    }
}

/// Deserializes a typed payload out of a `result` value.
pub(crate) fn from_result<T: serde::de::DeserializeOwned>(result: Value) -> Result<T, ApiError> {
    serde_json::from_value(result).map_err(Into::into)
}
