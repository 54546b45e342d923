// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Callback management for event engine subscriptions.
//!
//! - [`SubscriptionId`] - Unique identifier for unsubscribing
//! - [`CallbackRegistry`] - Registry storing callbacks and dispatching
//!   engine notifications to them

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::event::{IntercomEvent, LogEvent};
use crate::state::DerivedState;

/// Unique identifier for a subscription.
///
/// Returned when registering a callback and used to unsubscribe later. IDs
/// are unique within one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    #[must_use]
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", self.0)
    }
}

type EventCallback = Arc<dyn Fn(&LogEvent, &DerivedState) + Send + Sync>;
type SwitchCallback = Arc<dyn Fn(u32, bool) + Send + Sync>;
type StateCallback = Arc<dyn Fn(&DerivedState) + Send + Sync>;

/// Registry of engine callbacks.
///
/// Thread-safe through `parking_lot::RwLock`; callbacks are called
/// synchronously on the engine task, so they should return quickly.
pub struct CallbackRegistry {
    next_id: AtomicU64,
    /// Every processed event, verbatim.
    event_callbacks: RwLock<HashMap<SubscriptionId, EventCallback>>,
    /// Rejected credentials, renamed with the `Invalid` suffix.
    invalid_credential_callbacks: RwLock<HashMap<SubscriptionId, EventCallback>>,
    switch_callbacks: RwLock<HashMap<SubscriptionId, SwitchCallback>>,
    state_changed_callbacks: RwLock<HashMap<SubscriptionId, StateCallback>>,
}

impl CallbackRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            event_callbacks: RwLock::new(HashMap::new()),
            invalid_credential_callbacks: RwLock::new(HashMap::new()),
            switch_callbacks: RwLock::new(HashMap::new()),
            state_changed_callbacks: RwLock::new(HashMap::new()),
        }
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    // =========================================================================
    // Registration methods
    // =========================================================================

    /// Registers a callback for every processed event.
    ///
    /// The callback receives the raw event and the state after it was
    /// applied.
    pub fn on_event<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&LogEvent, &DerivedState) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.event_callbacks.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for rejected cards, codes and mobile keys.
    pub fn on_invalid_credential<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&LogEvent, &DerivedState) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.invalid_credential_callbacks
            .write()
            .insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for switch changes (switch id, active).
    pub fn on_switch_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(u32, bool) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.switch_callbacks.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback receiving the state after every event.
    pub fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&DerivedState) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.state_changed_callbacks
            .write()
            .insert(id, Arc::new(callback));
        id
    }

    // =========================================================================
    // Unsubscription
    // =========================================================================

    /// Unregisters a callback.
    ///
    /// Returns `true` if a callback was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.event_callbacks.write().remove(&id).is_some()
            || self.invalid_credential_callbacks.write().remove(&id).is_some()
            || self.switch_callbacks.write().remove(&id).is_some()
            || self.state_changed_callbacks.write().remove(&id).is_some()
    }

    /// Removes all callbacks.
    pub fn clear(&self) {
        self.event_callbacks.write().clear();
        self.invalid_credential_callbacks.write().clear();
        self.switch_callbacks.write().clear();
        self.state_changed_callbacks.write().clear();
    }

    // =========================================================================
    // Dispatch methods
    // =========================================================================

    /// Dispatches a notification to the matching callbacks.
    ///
    /// `Received` notifications also reach the state callbacks.
    pub fn dispatch(&self, notification: &IntercomEvent) {
        match notification {
            IntercomEvent::Received { event, state } => {
                for callback in self.event_callbacks.read().values() {
                    callback(event, state);
                }
                for callback in self.state_changed_callbacks.read().values() {
                    callback(state);
                }
            }
            IntercomEvent::InvalidCredential { event, state, .. } => {
                for callback in self.invalid_credential_callbacks.read().values() {
                    callback(event, state);
                }
            }
            IntercomEvent::SwitchChanged { switch, active } => {
                for callback in self.switch_callbacks.read().values() {
                    callback(*switch, *active);
                }
            }
        }
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Returns the number of registered callbacks.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.event_callbacks.read().len()
            + self.invalid_credential_callbacks.read().len()
            + self.switch_callbacks.read().len()
            + self.state_changed_callbacks.read().len()
    }

    /// Returns `true` if no callback is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callback_count() == 0
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("callback_count", &self.callback_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU32;

    use super::*;

    fn received(event: LogEvent) -> IntercomEvent {
        IntercomEvent::Received {
            event,
            state: DerivedState::default(),
        }
    }

    #[test]
    fn subscription_id_display() {
        let id = SubscriptionId::new(42);
        assert_eq!(id.to_string(), "Sub(42)");
        assert_eq!(id.value(), 42);
    }

    #[test]
    fn registry_new_is_empty() {
        let registry = CallbackRegistry::new();
        assert!(registry.is_empty());
    }

    #[test]
    fn event_callback_and_unsubscribe() {
        let registry = CallbackRegistry::new();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let id = registry.on_event(move |_event, _state| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(registry.callback_count(), 1);

        registry.dispatch(&received(LogEvent::new("MotionDetected")));
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        assert!(registry.unsubscribe(id));
        assert!(!registry.unsubscribe(id));
        assert!(registry.is_empty());

        registry.dispatch(&received(LogEvent::new("MotionDetected")));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn invalid_credential_only_reaches_its_callbacks() {
        let registry = CallbackRegistry::new();
        let names = Arc::new(RwLock::new(Vec::new()));
        let events = Arc::new(AtomicU32::new(0));

        let names_clone = names.clone();
        registry.on_invalid_credential(move |event, _state| {
            names_clone.write().push(event.name.clone());
        });
        let events_clone = events.clone();
        registry.on_event(move |_event, _state| {
            events_clone.fetch_add(1, Ordering::SeqCst);
        });

        let raw = LogEvent::new("CardEntered").with_param("valid", false);
        registry.dispatch(&IntercomEvent::InvalidCredential {
            event: raw.renamed("CardEnteredInvalid"),
            original: raw.name.clone(),
            state: DerivedState::default(),
        });

        assert_eq!(*names.read(), vec!["CardEnteredInvalid".to_string()]);
        assert_eq!(events.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn switch_and_state_callbacks() {
        let registry = CallbackRegistry::new();
        let switch = Arc::new(RwLock::new(None));
        let states = Arc::new(AtomicU32::new(0));

        let switch_clone = switch.clone();
        registry.on_switch_changed(move |id, active| {
            *switch_clone.write() = Some((id, active));
        });
        let states_clone = states.clone();
        registry.on_state_changed(move |_state| {
            states_clone.fetch_add(1, Ordering::SeqCst);
        });

        registry.dispatch(&IntercomEvent::SwitchChanged {
            switch: 3,
            active: false,
        });
        registry.dispatch(&received(LogEvent::new("DoorStateChanged")));

        assert_eq!(*switch.read(), Some((3, false)));
        assert_eq!(states.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn clear_removes_everything() {
        let registry = CallbackRegistry::new();
        registry.on_event(|_, _| {});
        registry.on_switch_changed(|_, _| {});
        registry.on_state_changed(|_| {});
        assert_eq!(registry.callback_count(), 3);

        registry.clear();
        assert!(registry.is_empty());
    }
}
