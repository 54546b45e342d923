// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `TwoNR` library.
//!
//! Failures are grouped in three kinds: a malformed digest challenge, a
//! rejected login, and everything else the device or the network can do
//! wrong, which is normalized into [`ApiError`].

use std::time::Duration;

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// The device sent a digest challenge that cannot be answered.
    #[error("challenge error: {0}")]
    Challenge(#[from] ChallengeError),

    /// The device rejected the credentials, even after re-authentication.
    #[error("unauthorized: the device rejected the credentials")]
    Unauthorized,

    /// The request failed at the HTTP, envelope or network level.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// The client configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Returns `true` if this error is an [`ApiError`].
    #[must_use]
    pub fn is_api(&self) -> bool {
        matches!(self, Self::Api(_))
    }
}

/// Errors raised while reading a `WWW-Authenticate: Digest` challenge.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChallengeError {
    /// No digest challenge was present in the 401 response.
    #[error("digest challenge missing")]
    Missing,

    /// The challenge lacks a mandatory field.
    #[error("digest challenge incomplete: missing {0}")]
    Incomplete(&'static str),

    /// The challenge asks for a hash algorithm this library does not implement.
    #[error("unsupported digest algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

/// Errors returned by the device API or the underlying transport.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The device answered with a non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body text (may be empty).
        body: String,
    },

    /// The device reported `success: false` with an error object.
    #[error("device error {code:?}: {description}")]
    Device {
        /// Numeric error code reported by the device.
        code: Option<i64>,
        /// Human readable description.
        description: String,
    },

    /// The response did not have the expected shape.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// The request did not complete in time.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// The connection could not be established or was interrupted.
    #[error("connection failed: {0}")]
    Connection(String),
}

impl ApiError {
    /// Normalizes a transport failure for a request sent with `timeout`.
    pub(crate) fn from_transport(err: &reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(duration_ms(timeout))
        } else if err.is_decode() || err.is_body() {
            Self::UnexpectedResponse(err.to_string())
        } else {
            Self::Connection(err.to_string())
        }
    }
}

/// Converts a duration to whole milliseconds, saturating at `u64::MAX`.
pub(crate) fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::UnexpectedResponse(err.to_string())
    }
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
