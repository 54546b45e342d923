// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscribable trait for types that publish engine notifications.

use crate::event::LogEvent;
use crate::state::DerivedState;
use crate::subscription::SubscriptionId;

/// Trait for types that deliver device events to callbacks.
///
/// Implemented by the event engine and by the session that owns one.
///
/// # Examples
///
/// ```no_run
/// use twonr_lib::protocol::HttpConfig;
/// use twonr_lib::subscription::Subscribable;
/// use twonr_lib::{Session, SessionOptions};
///
/// # async fn example() -> twonr_lib::Result<()> {
/// let session = Session::connect(
///     HttpConfig::new("192.168.1.50").with_digest_auth("admin", "2n"),
///     SessionOptions::default(),
/// )
/// .await?;
///
/// let sub_id = session.on_event(|event, state| {
///     println!("{} (door open: {})", event.name, state.door_open);
/// });
///
/// session.on_invalid_credential(|event, _| {
///     println!("Rejected: {}", event.name);
/// });
///
/// session.unsubscribe(sub_id);
/// # Ok(())
/// # }
/// ```
pub trait Subscribable {
    /// Subscribes to every processed event, with the state after it.
    fn on_event<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&LogEvent, &DerivedState) + Send + Sync + 'static;

    /// Subscribes to rejected credentials.
    ///
    /// The event is renamed with the `Invalid` suffix, e.g.
    /// `CardEnteredInvalid`.
    fn on_invalid_credential<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&LogEvent, &DerivedState) + Send + Sync + 'static;

    /// Subscribes to switch changes (switch id, active).
    fn on_switch_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(u32, bool) + Send + Sync + 'static;

    /// Subscribes to the state after every event.
    fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&DerivedState) + Send + Sync + 'static;

    /// Removes a subscription. Returns `true` if it existed.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}
