// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Callback subscriptions to device events.
//!
//! - [`SubscriptionId`] - A unique identifier for a subscription, used to unsubscribe
//! - [`CallbackRegistry`] - Registry that stores callbacks and dispatches notifications
//! - [`Subscribable`] - Trait for types that support callback subscriptions
//!
//! Callbacks complement the broadcast [`EventBus`](crate::event::EventBus):
//! use callbacks for quick synchronous reactions and the bus for async
//! consumers.

mod callback;
mod subscribable;

pub use callback::{CallbackRegistry, SubscriptionId};
pub use subscribable::Subscribable;
