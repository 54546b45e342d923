// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP transport for the 2N API.
//!
//! - [`HttpConfig`]: connection parameters (host, scheme, credentials, timeout)
//! - [`HttpClient`]: authenticated requests with error normalization
//! - [`ApiRequest`]: a path with query parameters and an optional timeout
//! - [`ByteStream`]: an open response body for MJPEG streams

mod http;
mod request;
mod stream;

pub use http::{ApiResponse, HttpClient, HttpConfig, ResponseMode};
pub use request::ApiRequest;
pub use stream::{ByteStream, DEFAULT_STREAM_CONTENT_TYPE};
