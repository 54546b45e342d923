// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Camera capabilities from `/api/camera/caps`.

use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::types::{Resolution, parse_int};

#[derive(Debug, Default, Deserialize)]
struct CameraCaps {
    #[serde(default)]
    resolutions: Vec<Value>,
}

/// Parses `result.resolutions[]` into a list of resolutions.
///
/// Entries without a positive width and height are skipped.
///
/// # Errors
///
/// Returns [`ApiError::UnexpectedResponse`] if the payload is not an object.
pub fn parse_camera_caps(result: Value) -> Result<Vec<Resolution>, ApiError> {
    let caps: CameraCaps = super::from_result(result)?;

    Ok(caps
        .resolutions
        .iter()
        .filter_map(|r| {
            let width = u32::try_from(r.get("width").and_then(parse_int)?).ok()?;
            let height = u32::try_from(r.get("height").and_then(parse_int)?).ok()?;
            (width > 0 && height > 0).then_some(Resolution::new(width, height))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn resolutions_are_parsed() {
        let list = parse_camera_caps(json!({
            "jpegResolution": [],
            "resolutions": [
                {"width": 160, "height": 120},
                {"width": "640", "height": "480"},
                {"width": 0, "height": 480},
                {"width": 1280}
            ]
        }))
        .unwrap();

        assert_eq!(
            list,
            vec![Resolution::new(160, 120), Resolution::new(640, 480)]
        );
    }
}
