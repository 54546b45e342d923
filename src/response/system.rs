// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device identity from `/api/system/info`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::ApiError;
use crate::types::MacAddress;

/// Title used when the device reports neither a name nor a variant.
const DEFAULT_TITLE: &str = "2N Intercom";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SystemInfoResult {
    device_name: Option<String>,
    variant: Option<String>,
    serial_number: Option<String>,
    mac_addr: Option<String>,
    sw_version: Option<String>,
    hw_version: Option<String>,
    build_type: Option<String>,
    boot_uuid: Option<String>,
}

/// Identity of a device, fetched once when a session starts.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use twonr_lib::response::DeviceInfo;
///
/// let info = DeviceInfo::from_result(json!({
///     "variant": "2N IP Verso",
///     "serialNumber": "54-0000-0001",
///     "macAddr": "7c-1e-b3-eb-40-a9",
///     "swVersion": "2.40.0.52.7",
/// }))
/// .unwrap();
/// assert_eq!(info.title, "2N IP Verso");
/// assert_eq!(info.mac.unwrap().to_string(), "7C:1E:B3:EB:40:A9");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// Display name (device name, else variant).
    pub title: String,
    /// Product variant, e.g. `2N IP Verso`.
    pub model: Option<String>,
    /// Serial number.
    pub serial: Option<String>,
    /// Canonical MAC address, absent if the reported one is malformed.
    pub mac: Option<MacAddress>,
    /// Firmware version.
    pub sw_version: Option<String>,
    /// Hardware revision.
    pub hw_version: Option<String>,
    /// Firmware build type (`beta`, `release`, ...).
    pub build_type: Option<String>,
    /// Identifier that changes on every reboot.
    pub boot_id: Option<String>,
}

impl DeviceInfo {
    /// Builds the device info from an `/api/system/info` result payload.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::UnexpectedResponse`] if the payload is not an
    /// object.
    pub fn from_result(result: Value) -> Result<Self, ApiError> {
        let raw: SystemInfoResult = super::from_result(result)?;

        let model = non_empty(raw.variant);
        let title = non_empty(raw.device_name)
            .or_else(|| model.clone())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());

        Ok(Self {
            title,
            model,
            serial: non_empty(raw.serial_number),
            mac: raw.mac_addr.as_deref().and_then(MacAddress::parse),
            sw_version: non_empty(raw.sw_version),
            hw_version: non_empty(raw.hw_version),
            build_type: non_empty(raw.build_type),
            boot_id: non_empty(raw.boot_uuid),
        })
    }

    /// Returns a stable identifier: the serial number, else the MAC address.
    #[must_use]
    pub fn unique_id(&self) -> Option<String> {
        self.serial
            .clone()
            .or_else(|| self.mac.map(|m| m.to_string()))
    }

    /// Parses the boot identifier as a UUID.
    #[must_use]
    pub fn boot_uuid(&self) -> Option<Uuid> {
        self.boot_id.as_deref().and_then(|id| Uuid::parse_str(id).ok())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
