// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Open response bodies read chunk by chunk.

use bytes::Bytes;

use crate::error::{ApiError, Result};

/// Content type reported when the device omits one on a stream.
pub const DEFAULT_STREAM_CONTENT_TYPE: &str = "multipart/x-mixed-replace";

/// An open HTTP response whose body is read incrementally.
///
/// Used for MJPEG snapshot streams, which never end on their own. Dropping
/// the stream closes the connection.
#[derive(Debug)]
pub struct ByteStream {
    response: reqwest::Response,
    content_type: String,
}

impl ByteStream {
    pub(crate) fn new(response: reqwest::Response) -> Self {
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_STREAM_CONTENT_TYPE)
            .to_string();
        Self {
            response,
            content_type,
        }
    }

    /// Returns the response content type, including any multipart boundary.
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Reads the next chunk of the body, `None` once the body ends.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Connection`] if the connection fails mid-body.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        self.response
            .chunk()
            .await
            .map_err(|e| ApiError::Connection(e.to_string()).into())
    }
}
