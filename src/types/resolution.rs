// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Camera resolutions and snapshot sources.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A camera image size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Resolution {
    /// Resolution requested when the caller does not specify one.
    pub const DEFAULT_REQUEST: Self = Self::new(640, 480);

    /// Creates a resolution.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns the pixel count.
    #[must_use]
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Returns `true` if this resolution is at least as large as `other` in
    /// both dimensions.
    #[must_use]
    pub fn covers(&self, other: Self) -> bool {
        self.width >= other.width && self.height >= other.height
    }

    /// Resolutions assumed when the device does not report its own.
    #[must_use]
    pub fn fallback_list() -> Vec<Self> {
        vec![Self::new(640, 480), Self::new(1280, 960)]
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Picks the smallest supported resolution that covers `requested`.
///
/// When none is large enough the largest supported resolution is returned.
/// Returns `None` only for an empty list.
///
/// # Examples
///
/// ```
/// use twonr_lib::types::{Resolution, select_resolution};
///
/// let supported = [Resolution::new(1280, 960), Resolution::new(640, 480)];
/// assert_eq!(
///     select_resolution(&supported, Resolution::new(800, 600)),
///     Some(Resolution::new(1280, 960)),
/// );
/// ```
#[must_use]
pub fn select_resolution(supported: &[Resolution], requested: Resolution) -> Option<Resolution> {
    let mut sorted = supported.to_vec();
    sorted.sort_by_key(Resolution::area);

    sorted
        .iter()
        .copied()
        .find(|r| r.covers(requested))
        .or_else(|| sorted.last().copied())
}

/// Camera used for snapshots on devices with more than one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraSource {
    /// The built-in camera.
    #[default]
    Internal,
    /// An external IP camera configured on the device.
    External,
}

impl CameraSource {
    /// Returns the query parameter value.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::External => "external",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_smallest_covering() {
        let supported = [
            Resolution::new(1280, 960),
            Resolution::new(320, 240),
            Resolution::new(640, 480),
        ];
        assert_eq!(
            select_resolution(&supported, Resolution::new(640, 480)),
            Some(Resolution::new(640, 480))
        );
        assert_eq!(
            select_resolution(&supported, Resolution::new(100, 100)),
            Some(Resolution::new(320, 240))
        );
    }

    #[test]
    fn select_largest_when_none_covers() {
        let supported = Resolution::fallback_list();
        assert_eq!(
            select_resolution(&supported, Resolution::new(1920, 1080)),
            Some(Resolution::new(1280, 960))
        );
    }

    #[test]
    fn select_from_empty_list() {
        assert_eq!(select_resolution(&[], Resolution::DEFAULT_REQUEST), None);
    }

    #[test]
    fn display_resolution() {
        assert_eq!(Resolution::new(640, 480).to_string(), "640x480");
    }
}
