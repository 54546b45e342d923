// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed operations on a 2N device.
//!
//! [`Device`] wraps an [`HttpClient`] and exposes one method per API
//! endpoint, returning parsed domain values.
//!
//! ```no_run
//! use twonr_lib::Device;
//! use twonr_lib::protocol::HttpConfig;
//!
//! # async fn example() -> twonr_lib::Result<()> {
//! let device = Device::connect(
//!     HttpConfig::new("192.168.1.50").with_digest_auth("admin", "2n"),
//! )?;
//!
//! let info = device.device_info().await?;
//! println!("{} ({:?})", info.title, info.serial);
//!
//! device.trigger_switch(1).await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use bytes::Bytes;

use crate::error::Result;
use crate::event::{ChannelId, LogEvent, LogInclude};
use crate::protocol::{ApiRequest, ByteStream, HttpClient, HttpConfig};
use crate::response::{
    DeviceInfo, SwitchCapability, SwitchStatus, parse_camera_caps, parse_log_caps, parse_pull,
    parse_subscribe, parse_switch_caps, parse_switch_status,
};
use crate::types::{CameraSource, Resolution};

/// Extra time allowed on top of a long-poll wait before the HTTP request
/// itself times out.
const PULL_GRACE: Duration = Duration::from_secs(10);

/// A 2N intercom reachable over HTTP.
///
/// The device is cheap to clone; clones share the underlying connection
/// pool and digest state.
#[derive(Debug, Clone)]
pub struct Device {
    client: HttpClient,
}

impl Device {
    /// Creates a device from an existing client.
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Creates a device from a configuration.
    ///
    /// No request is sent until an operation is called.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the client cannot
    /// be created.
    pub fn connect(config: HttpConfig) -> Result<Self> {
        Ok(Self::new(config.into_client()?))
    }

    /// Returns the underlying client.
    #[must_use]
    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    // ========== System ==========

    /// Fetches the device identity (`/api/system/info`).
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the payload is malformed.
    pub async fn device_info(&self) -> Result<DeviceInfo> {
        let result = self
            .client
            .get_json(&ApiRequest::get("/api/system/info"))
            .await?;
        Ok(DeviceInfo::from_result(result)?)
    }

    // ========== Switches ==========

    /// Fetches the switch configuration (`/api/switch/caps`).
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the payload is malformed.
    pub async fn switch_capabilities(&self) -> Result<Vec<SwitchCapability>> {
        let result = self
            .client
            .get_json(&ApiRequest::get("/api/switch/caps"))
            .await?;
        Ok(parse_switch_caps(result)?)
    }

    /// Fetches the current switch states (`/api/switch/status`).
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the payload is malformed.
    pub async fn switch_status(&self) -> Result<Vec<SwitchStatus>> {
        let result = self
            .client
            .get_json(&ApiRequest::get("/api/switch/status"))
            .await?;
        Ok(parse_switch_status(result)?)
    }

    /// Fires a switch (`/api/switch/ctrl?action=trigger`).
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the device rejects it.
    pub async fn trigger_switch(&self, switch: u32) -> Result<()> {
        let request = ApiRequest::get("/api/switch/ctrl")
            .query("switch", switch)
            .query("action", "trigger");
        self.client.get_json(&request).await?;
        tracing::debug!(switch, "Triggered switch");
        Ok(())
    }

    // ========== Camera ==========

    /// Fetches the supported snapshot resolutions (`/api/camera/caps`).
    ///
    /// Some accounts lack the camera privilege and some models have no
    /// camera; any failure, or an empty list, falls back to
    /// [`Resolution::fallback_list`].
    pub async fn camera_capabilities(&self) -> Vec<Resolution> {
        match self.fetch_camera_caps().await {
            Ok(list) if !list.is_empty() => list,
            Ok(_) => Resolution::fallback_list(),
            Err(e) => {
                tracing::debug!(error = %e, "Camera caps unavailable, using defaults");
                Resolution::fallback_list()
            }
        }
    }

    async fn fetch_camera_caps(&self) -> Result<Vec<Resolution>> {
        let result = self
            .client
            .get_json(&ApiRequest::get("/api/camera/caps"))
            .await?;
        Ok(parse_camera_caps(result)?)
    }

    /// Fetches one JPEG snapshot.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn snapshot(&self, resolution: Resolution, source: CameraSource) -> Result<Bytes> {
        let request = snapshot_request(resolution, source);
        self.client.get_bytes(&request).await
    }

    /// Opens a multipart MJPEG stream at `fps` frames per second (at least 1).
    ///
    /// # Errors
    ///
    /// Returns error if the stream cannot be opened.
    pub async fn open_snapshot_stream(
        &self,
        resolution: Resolution,
        fps: u8,
        source: CameraSource,
    ) -> Result<ByteStream> {
        let request = snapshot_request(resolution, source).query("fps", fps.max(1));
        self.client.open_stream(&request).await
    }

    // ========== Event log ==========

    /// Fetches the event types this device can report (`/api/log/caps`).
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the payload is malformed.
    pub async fn log_capabilities(&self) -> Result<Vec<String>> {
        let result = self
            .client
            .get_json(&ApiRequest::get("/api/log/caps"))
            .await?;
        Ok(parse_log_caps(result)?)
    }

    /// Opens a subscription channel (`/api/log/subscribe`).
    ///
    /// An empty `filter` subscribes to every event type. The device closes
    /// the channel on its own after `duration` without a pull.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or no channel id is returned.
    pub async fn subscribe_log(
        &self,
        filter: &[String],
        include: LogInclude,
        duration: Duration,
    ) -> Result<ChannelId> {
        let filter = (!filter.is_empty()).then(|| filter.join(","));
        let request = ApiRequest::get("/api/log/subscribe")
            .query("include", include.to_query_value())
            .query("duration", duration.as_secs())
            .query_opt("filter", filter);

        let result = self.client.get_json(&request).await?;
        Ok(parse_subscribe(&result)?)
    }

    /// Waits up to `timeout` for events on a channel (`/api/log/pull`).
    ///
    /// The HTTP request is allowed 10 seconds more than the long-poll wait.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails, for instance because the channel
    /// expired or the device rebooted.
    pub async fn pull_log(&self, channel: ChannelId, timeout: Duration) -> Result<Vec<LogEvent>> {
        let request = ApiRequest::get("/api/log/pull")
            .query("id", channel)
            .query("timeout", timeout.as_secs())
            .timeout(pull_http_timeout(timeout));

        let result = self.client.get_json(&request).await?;
        Ok(parse_pull(result)?)
    }

    /// Closes a subscription channel (`/api/log/unsubscribe`).
    ///
    /// # Errors
    ///
    /// Returns error if the request fails, including when the channel no
    /// longer exists.
    pub async fn unsubscribe_log(&self, channel: ChannelId) -> Result<()> {
        let request = ApiRequest::get("/api/log/unsubscribe").query("id", channel);
        self.client.get_json(&request).await?;
        Ok(())
    }
}

fn snapshot_request(resolution: Resolution, source: CameraSource) -> ApiRequest {
    ApiRequest::get("/api/camera/snapshot")
        .query("width", resolution.width)
        .query("height", resolution.height)
        .query("source", source.as_str())
}

fn pull_http_timeout(wait: Duration) -> Duration {
    Duration::from_secs(wait.as_secs().saturating_add(PULL_GRACE.as_secs())).max(PULL_GRACE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pull_timeout_adds_grace() {
        assert_eq!(
            pull_http_timeout(Duration::from_secs(25)),
            Duration::from_secs(35)
        );
        assert_eq!(pull_http_timeout(Duration::ZERO), Duration::from_secs(10));
    }

    #[test]
    fn snapshot_request_without_fps() {
        let request = snapshot_request(Resolution::new(640, 480), CameraSource::Internal);
        assert_eq!(
            request.target(),
            "/api/camera/snapshot?width=640&height=480&source=internal"
        );
    }

    #[test]
    fn connect_builds_client() {
        let device = Device::connect(HttpConfig::new("192.168.1.50").with_http()).unwrap();
        assert_eq!(device.client().base_url(), "http://192.168.1.50");
    }
}
