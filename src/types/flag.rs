// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Lenient conversions of JSON event parameters.
//!
//! Event parameters arrive as loosely typed JSON: a flag may be `true`,
//! `1` or `"yes"` depending on firmware version and event type.

use serde_json::Value;

/// Parses a boolean from a boolean, number or string value.
///
/// Accepted strings (case-insensitive, trimmed) are `true`/`1`/`yes`/`on`
/// and `false`/`0`/`no`/`off`. Anything else is indeterminate and yields
/// `None`.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use twonr_lib::types::parse_flag;
///
/// assert_eq!(parse_flag(&json!("On")), Some(true));
/// assert_eq!(parse_flag(&json!(0)), Some(false));
/// assert_eq!(parse_flag(&json!("maybe")), None);
/// ```
#[must_use]
pub fn parse_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Parses an integer from a number or a numeric string.
#[must_use]
pub fn parse_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Returns the value as text: strings verbatim, other scalars rendered.
#[must_use]
pub fn parse_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn flag_from_bool_and_number() {
        assert_eq!(parse_flag(&json!(true)), Some(true));
        assert_eq!(parse_flag(&json!(false)), Some(false));
        assert_eq!(parse_flag(&json!(1)), Some(true));
        assert_eq!(parse_flag(&json!(0)), Some(false));
        assert_eq!(parse_flag(&json!(2.5)), Some(true));
    }

    #[test]
    fn flag_from_strings() {
        for s in ["true", "1", "yes", "on", " TRUE "] {
            assert_eq!(parse_flag(&json!(s)), Some(true), "{s}");
        }
        for s in ["false", "0", "no", "off", "Off"] {
            assert_eq!(parse_flag(&json!(s)), Some(false), "{s}");
        }
    }

    #[test]
    fn flag_indeterminate() {
        assert_eq!(parse_flag(&json!("open")), None);
        assert_eq!(parse_flag(&json!(null)), None);
        assert_eq!(parse_flag(&json!([])), None);
    }

    #[test]
    fn int_from_number_or_string() {
        assert_eq!(parse_int(&json!(7)), Some(7));
        assert_eq!(parse_int(&json!(" 12 ")), Some(12));
        assert_eq!(parse_int(&json!("x")), None);
        assert_eq!(parse_int(&json!(1.5)), None);
    }

    #[test]
    fn text_from_scalars() {
        assert_eq!(parse_text(&json!("peer")).as_deref(), Some("peer"));
        assert_eq!(parse_text(&json!(5)).as_deref(), Some("5"));
        assert_eq!(parse_text(&json!({})), None);
    }
}
