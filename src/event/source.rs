// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The log endpoints the event engine drives.

use std::future::Future;
use std::time::Duration;

use super::{ChannelId, LogEvent, LogInclude};
use crate::device::Device;
use crate::error::Result;

/// Access to a device's event subscription endpoints.
///
/// [`Device`] is the production implementation; tests drive the engine
/// with scripted sources.
pub trait LogSource: Send + Sync + 'static {
    /// Opens a channel for new events of the given types.
    fn subscribe(
        &self,
        filter: &[String],
        duration: Duration,
    ) -> impl Future<Output = Result<ChannelId>> + Send;

    /// Waits up to `timeout` for events on `channel`.
    fn pull(
        &self,
        channel: ChannelId,
        timeout: Duration,
    ) -> impl Future<Output = Result<Vec<LogEvent>>> + Send;

    /// Closes `channel`.
    fn unsubscribe(&self, channel: ChannelId) -> impl Future<Output = Result<()>> + Send;
}

impl LogSource for Device {
    async fn subscribe(&self, filter: &[String], duration: Duration) -> Result<ChannelId> {
        self.subscribe_log(filter, LogInclude::New, duration).await
    }

    async fn pull(&self, channel: ChannelId, timeout: Duration) -> Result<Vec<LogEvent>> {
        self.pull_log(channel, timeout).await
    }

    async fn unsubscribe(&self, channel: ChannelId) -> Result<()> {
        self.unsubscribe_log(channel).await
    }
}
