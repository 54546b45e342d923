// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Broadcast channel of engine notifications.

use tokio::sync::broadcast;

use super::IntercomEvent;

const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Fans engine notifications out to any number of receivers.
///
/// Each receiver gets its own copy of every notification published after it
/// subscribed. A receiver that falls more than the channel capacity behind
/// loses the oldest notifications and sees `RecvError::Lagged`.
///
/// # Examples
///
/// ```
/// use twonr_lib::event::{EventBus, IntercomEvent};
///
/// let bus = EventBus::new();
/// let mut rx = bus.subscribe();
///
/// bus.publish(IntercomEvent::SwitchChanged { switch: 1, active: true });
/// assert_eq!(rx.try_recv().unwrap().name(), "SwitchStateChanged");
/// ```
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<IntercomEvent>,
}

impl EventBus {
    /// Creates a bus with the default capacity (256).
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Creates a bus buffering up to `capacity` notifications per receiver.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Returns a receiver for notifications published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<IntercomEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of live receivers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publishes a notification, discarding it if nobody listens.
    pub fn publish(&self, event: IntercomEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
