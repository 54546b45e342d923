// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Request description for the 2N HTTP API.

use std::fmt::Write as _;
use std::time::Duration;

use reqwest::Method;

/// A request against one API path.
///
/// The request target (path plus encoded query string) is used both to build
/// the URL and as the `uri` of a digest response, so the two always match.
///
/// # Examples
///
/// ```
/// use twonr_lib::protocol::ApiRequest;
///
/// let request = ApiRequest::get("/api/switch/ctrl")
///     .query("switch", 1)
///     .query("action", "trigger");
/// assert_eq!(request.target(), "/api/switch/ctrl?switch=1&action=trigger");
/// ```
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    timeout: Option<Duration>,
}

impl ApiRequest {
    /// Creates a request with the given method.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            timeout: None,
        }
    }

    /// Creates a `GET` request.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Appends a query parameter when `value` is present.
    #[must_use]
    pub fn query_opt(self, key: impl Into<String>, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    /// Overrides the client's default timeout for this request.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the path without query string.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the per-request timeout, if overridden.
    #[must_use]
    pub fn timeout_override(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns the path followed by the percent-encoded query string.
    #[must_use]
    pub fn target(&self) -> String {
        let mut target = self.path.clone();
        for (i, (key, value)) in self.query.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            let _ = write!(
                target,
                "{sep}{}={}",
                urlencoding::encode(key),
                urlencoding::encode(value)
            );
        }
        target
    }
}
