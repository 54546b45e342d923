// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MAC address normalization.

use std::fmt;

use serde::{Serialize, Serializer};

/// A MAC address in canonical form.
///
/// Devices report MAC addresses with `-`, `:` or no separators and in either
/// case. [`MacAddress::parse`] accepts all of these and always displays the
/// address as colon separated uppercase pairs.
///
/// # Examples
///
/// ```
/// use twonr_lib::types::MacAddress;
///
/// let mac = MacAddress::parse("7c-1e-b3-eb-40-a9").unwrap();
/// assert_eq!(mac.to_string(), "7C:1E:B3:EB:40:A9");
///
/// assert!(MacAddress::parse("7c-1e-b3").is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    /// Parses a MAC address, returning `None` unless the input reduces to
    /// exactly 12 hex digits once `-` and `:` separators are removed.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let digits: String = input
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != ':')
            .collect();
        if digits.len() != 12 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }

        let mut bytes = [0u8; 6];
        hex::decode_to_slice(&digits, &mut bytes).ok()?;
        Some(Self(bytes))
    }

    /// Returns the raw address bytes.
    #[must_use]
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl Serialize for MacAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
