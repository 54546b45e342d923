// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Login credentials and authentication scheme selection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Authentication scheme used to talk to the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// HTTP Basic: credentials are sent with every request.
    Basic,
    /// HTTP Digest: requests are sent unauthenticated first and answered
    /// on challenge.
    #[default]
    Digest,
}

impl AuthMethod {
    /// Returns the lowercase name of the scheme.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Digest => "digest",
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "digest" => Ok(Self::Digest),
            other => Err(Error::Config(format!("unknown auth method: {other}"))),
        }
    }
}

/// Username and password for a device account.
///
/// Credentials are immutable for the lifetime of a client. The password is
/// redacted from the `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
    method: AuthMethod,
}

impl Credentials {
    /// Creates credentials using the given scheme.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>, method: AuthMethod) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            method,
        }
    }

    /// Creates Digest credentials.
    #[must_use]
    pub fn digest(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::new(username, password, AuthMethod::Digest)
    }

    /// Creates Basic credentials.
    #[must_use]
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::new(username, password, AuthMethod::Basic)
    }

    /// Returns the username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Returns the authentication scheme.
    #[must_use]
    pub fn method(&self) -> AuthMethod {
        self.method
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("method", &self.method)
            .finish()
    }
}
