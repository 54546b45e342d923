// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared, observable holder of the derived state.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::watch;

use super::{Applied, DerivedState};
use crate::event::LogEvent;

/// Shared handle to a [`DerivedState`].
///
/// The event engine is the only writer; any number of readers can take
/// snapshots or watch for changes. Clones share the same state.
#[derive(Debug, Clone)]
pub struct StateStore {
    state: Arc<RwLock<DerivedState>>,
    changes: Arc<watch::Sender<DerivedState>>,
}

impl StateStore {
    /// Creates a store holding an empty state.
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = watch::channel(DerivedState::default());
        Self {
            state: Arc::new(RwLock::new(DerivedState::default())),
            changes: Arc::new(changes),
        }
    }

    /// Returns a copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> DerivedState {
        self.state.read().clone()
    }

    /// Returns a receiver notified with every new state.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<DerivedState> {
        self.changes.subscribe()
    }

    /// Applies an event and returns its side effects with the new state.
    pub fn apply(&self, event: &LogEvent) -> (Applied, DerivedState) {
        self.update(|state| state.apply(event))
    }

    /// Replaces the switch map.
    pub fn seed_switches(&self, switches: impl IntoIterator<Item = (u32, bool)>) {
        self.update(|state| state.seed_switches(switches));
    }

    fn update<R>(&self, f: impl FnOnce(&mut DerivedState) -> R) -> (R, DerivedState) {
        let (result, snapshot) = {
            let mut state = self.state.write();
            let result = f(&mut state);
            (result, state.clone())
        };
        self.changes.send_replace(snapshot.clone());
        (result, snapshot)
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let store = StateStore::new();
        let reader = store.clone();

        store.apply(&LogEvent::new("DoorStateChanged").with_param("state", "opened"));
        assert!(reader.snapshot().door_open);
    }

    #[test]
    fn apply_returns_snapshot() {
        let store = StateStore::new();
        let (applied, state) =
            store.apply(&LogEvent::new("CardEntered").with_param("valid", false));

        assert!(applied.invalid.is_some());
        assert_eq!(state, store.snapshot());
    }

    #[tokio::test]
    async fn watchers_see_updates() {
        let store = StateStore::new();
        let mut rx = store.watch();

        store.seed_switches([(1, true)]);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().switch_active(1), Some(true));

        store.apply(&LogEvent::new("NoiseDetected").with_param("state", "in"));
        rx.changed().await.unwrap();
        assert!(rx.borrow().noise);
    }
}
