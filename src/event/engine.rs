// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Long-poll event subscription engine.
//!
//! The engine keeps one subscription channel open on the device and pulls
//! it in a loop on a background task. Every returned event is folded into
//! the [`StateStore`] and published on the [`EventBus`] and the
//! [`CallbackRegistry`].
//!
//! Errors never leave the loop: a failed subscribe or pull closes the
//! channel, waits with exponential backoff and starts over with a new
//! channel.
//!
//! ```no_run
//! use twonr_lib::Device;
//! use twonr_lib::event::{EngineConfig, EventEngine};
//! use twonr_lib::protocol::HttpConfig;
//!
//! # async fn example() -> twonr_lib::Result<()> {
//! let device = Device::connect(
//!     HttpConfig::new("192.168.1.50").with_digest_auth("admin", "2n"),
//! )?;
//!
//! let mut engine = EventEngine::new(device, EngineConfig::default());
//! let mut events = engine.subscribe();
//! engine.start();
//!
//! while let Ok(event) = events.recv().await {
//!     println!("{}: {:?}", event.name(), event.params());
//! }
//!
//! engine.stop().await;
//! # Ok(())
//! # }
//! ```

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{ChannelId, DEFAULT_EVENT_FILTER, EventBus, IntercomEvent, LogEvent, LogSource};
use crate::error::{Error, Result, duration_ms};
use crate::state::{DerivedState, StateStore};
use crate::subscription::{CallbackRegistry, Subscribable, SubscriptionId};

/// Configuration of the poll loop.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use twonr_lib::event::EngineConfig;
///
/// let config = EngineConfig::new()
///     .with_filter(["MotionDetected", "DoorStateChanged"])
///     .with_pull_timeout(Duration::from_secs(10));
///
/// assert_eq!(config.filter().len(), 2);
/// assert_eq!(config.channel_duration(), Duration::from_secs(3600));
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    filter: Vec<String>,
    channel_duration: Duration,
    pull_timeout: Duration,
    initial_backoff: Duration,
    max_backoff: Duration,
    join_timeout: Duration,
}

impl EngineConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the event types to subscribe to. An empty filter subscribes to
    /// every type.
    #[must_use]
    pub fn with_filter<I, T>(mut self, filter: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.filter = filter.into_iter().map(Into::into).collect();
        self
    }

    /// Sets how long the device keeps an unpulled channel alive.
    #[must_use]
    pub fn with_channel_duration(mut self, duration: Duration) -> Self {
        self.channel_duration = duration;
        self
    }

    /// Sets the long-poll wait of each pull.
    #[must_use]
    pub fn with_pull_timeout(mut self, timeout: Duration) -> Self {
        self.pull_timeout = timeout;
        self
    }

    /// Sets the first retry delay and the cap it doubles up to.
    #[must_use]
    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max.max(initial);
        self
    }

    /// Sets how long [`EventEngine::stop`] waits for the loop to finish.
    #[must_use]
    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    /// Returns the subscribed event types.
    #[must_use]
    pub fn filter(&self) -> &[String] {
        &self.filter
    }

    /// Returns the channel duration.
    #[must_use]
    pub fn channel_duration(&self) -> Duration {
        self.channel_duration
    }

    /// Returns the long-poll wait.
    #[must_use]
    pub fn pull_timeout(&self) -> Duration {
        self.pull_timeout
    }

    /// Returns the first retry delay.
    #[must_use]
    pub fn initial_backoff(&self) -> Duration {
        self.initial_backoff
    }

    /// Returns the retry delay cap.
    #[must_use]
    pub fn max_backoff(&self) -> Duration {
        self.max_backoff
    }

    /// Returns the stop join timeout.
    #[must_use]
    pub fn join_timeout(&self) -> Duration {
        self.join_timeout
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_EVENT_FILTER.iter().map(ToString::to_string).collect(),
            channel_duration: Duration::from_secs(3600),
            pull_timeout: Duration::from_secs(25),
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            join_timeout: Duration::from_secs(15),
        }
    }
}

/// Exponential retry delay: starts at the initial delay and doubles after
/// every failure up to the cap.
///
/// ```
/// use std::time::Duration;
/// use twonr_lib::event::Backoff;
///
/// let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(3));
/// assert_eq!(backoff.next_delay(), Duration::from_secs(1));
/// assert_eq!(backoff.next_delay(), Duration::from_secs(2));
/// assert_eq!(backoff.next_delay(), Duration::from_secs(3));
///
/// backoff.reset();
/// assert_eq!(backoff.next_delay(), Duration::from_secs(1));
/// ```
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    /// Creates a backoff starting at `initial`, capped at `max`.
    #[must_use]
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            current: initial,
        }
    }

    /// Returns the delay to wait now and doubles the next one.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    /// Returns the delay the next failure would wait.
    #[must_use]
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Goes back to the initial delay.
    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// Where processed events go.
#[derive(Debug, Clone, Default)]
struct Observers {
    store: StateStore,
    bus: EventBus,
    callbacks: Arc<CallbackRegistry>,
}

impl Observers {
    fn publish(&self, notification: IntercomEvent) {
        self.callbacks.dispatch(&notification);
        self.bus.publish(notification);
    }

    /// Folds one event into the state and notifies observers.
    fn handle_event(&self, event: &LogEvent) {
        let (applied, state) = self.store.apply(event);

        if let Some((switch, active)) = applied.switch {
            self.publish(IntercomEvent::SwitchChanged { switch, active });
        }
        if let Some(invalid) = applied.invalid {
            tracing::debug!(event = %invalid.name, "Credential rejected");
            self.publish(IntercomEvent::InvalidCredential {
                event: invalid,
                original: event.name.clone(),
                state: state.clone(),
            });
        }
        self.publish(IntercomEvent::Received {
            event: event.clone(),
            state,
        });
    }
}

/// Keeps a device event subscription alive and publishes its events.
///
/// The engine owns its channel: it subscribes, pulls and unsubscribes on
/// its own, one pull at a time. Events of one batch are published in the
/// order the device returned them.
pub struct EventEngine<S: LogSource> {
    source: Arc<S>,
    config: EngineConfig,
    observers: Observers,
    cancellation: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl<S: LogSource> EventEngine<S> {
    /// Creates a stopped engine.
    #[must_use]
    pub fn new(source: S, config: EngineConfig) -> Self {
        Self::from_arc(Arc::new(source), config)
    }

    /// Creates a stopped engine sharing `source`.
    #[must_use]
    pub fn from_arc(source: Arc<S>, config: EngineConfig) -> Self {
        Self {
            source,
            config,
            observers: Observers::default(),
            cancellation: CancellationToken::new(),
            task: None,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns `true` while the poll loop runs.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Starts the poll loop on a new task. Does nothing if it already runs.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }

        self.cancellation = CancellationToken::new();
        let poll_loop = PollLoop {
            source: Arc::clone(&self.source),
            config: self.config.clone(),
            observers: self.observers.clone(),
            channel: None,
            backoff: Backoff::new(self.config.initial_backoff, self.config.max_backoff),
        };
        let cancel = self.cancellation.clone();

        self.task = Some(tokio::spawn(poll_loop.run(cancel)));
        tracing::info!(filter = ?self.config.filter, "Event engine started");
    }

    /// Stops the poll loop and waits for it to close its channel.
    ///
    /// A pending pull is abandoned. Never fails: a loop that does not
    /// finish within the join timeout is aborted and logged.
    pub async fn stop(&mut self) {
        self.cancellation.cancel();

        let Some(mut task) = self.task.take() else {
            return;
        };
        match tokio::time::timeout(self.config.join_timeout, &mut task).await {
            Ok(Ok(())) => tracing::info!("Event engine stopped"),
            Ok(Err(e)) => tracing::warn!(error = %e, "Event engine task failed"),
            Err(_) => {
                tracing::warn!("Event engine did not stop in time, aborting");
                task.abort();
            }
        }
    }

    /// Returns a copy of the current derived state.
    #[must_use]
    pub fn state(&self) -> DerivedState {
        self.observers.store.snapshot()
    }

    /// Returns the shared state store.
    #[must_use]
    pub fn state_store(&self) -> &StateStore {
        &self.observers.store
    }

    /// Returns a receiver notified after every event.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<DerivedState> {
        self.observers.store.watch()
    }

    /// Returns a receiver of all notifications published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<IntercomEvent> {
        self.observers.bus.subscribe()
    }

    /// Returns the notification bus.
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.observers.bus
    }

    /// Returns the callback registry.
    #[must_use]
    pub fn callbacks(&self) -> &CallbackRegistry {
        &self.observers.callbacks
    }
}

impl<S: LogSource> std::fmt::Debug for EventEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEngine")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl<S: LogSource> Subscribable for EventEngine<S> {
    fn on_event<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&LogEvent, &DerivedState) + Send + Sync + 'static,
    {
        self.callbacks().on_event(callback)
    }

    fn on_invalid_credential<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&LogEvent, &DerivedState) + Send + Sync + 'static,
    {
        self.callbacks().on_invalid_credential(callback)
    }

    fn on_switch_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(u32, bool) + Send + Sync + 'static,
    {
        self.callbacks().on_switch_changed(callback)
    }

    fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&DerivedState) + Send + Sync + 'static,
    {
        self.callbacks().on_state_changed(callback)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.callbacks().unsubscribe(id)
    }
}

impl<S: LogSource> Drop for EventEngine<S> {
    fn drop(&mut self) {
        if self.is_running() {
            tracing::debug!("Event engine dropped while running, cancelling");
            self.cancellation.cancel();
        }
    }
}

/// State owned by the background task.
struct PollLoop<S> {
    source: Arc<S>,
    config: EngineConfig,
    observers: Observers,
    channel: Option<ChannelId>,
    backoff: Backoff,
}

impl<S: LogSource> PollLoop<S> {
    async fn run(mut self, cancel: CancellationToken) {
        while !cancel.is_cancelled() {
            let outcome = tokio::select! {
                () = cancel.cancelled() => break,
                outcome = self.poll_once() => outcome,
            };

            let failed = match outcome {
                Ok(events) => {
                    self.backoff.reset();
                    !self.deliver(&events)
                }
                Err(e) => {
                    log_poll_error(&e, self.backoff.current());
                    true
                }
            };

            if failed {
                let delay = self.backoff.next_delay();
                self.close_channel().await;

                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(delay) => {}
                }
            }
        }

        self.close_channel().await;
    }

    /// Hands a batch to the observers in order. Returns `false` if an
    /// observer panicked; the rest of the batch is dropped.
    fn deliver(&self, events: &[LogEvent]) -> bool {
        let observers = &self.observers;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            for event in events {
                observers.handle_event(event);
            }
        }));

        match outcome {
            Ok(()) => true,
            Err(payload) => {
                tracing::error!(
                    panic = panic_message(payload.as_ref()),
                    delay_ms = duration_ms(self.backoff.current()),
                    "Event observer panicked, reopening channel"
                );
                false
            }
        }
    }

    /// Opens a channel if none is open, then pulls it once.
    async fn poll_once(&mut self) -> Result<Vec<LogEvent>> {
        let channel = match self.channel {
            Some(channel) => channel,
            None => {
                let channel = self
                    .source
                    .subscribe(&self.config.filter, self.config.channel_duration)
                    .await?;
                tracing::debug!(%channel, "Opened event channel");
                self.channel = Some(channel);
                channel
            }
        };

        let events = self.source.pull(channel, self.config.pull_timeout).await?;
        if !events.is_empty() {
            tracing::trace!(%channel, count = events.len(), "Pulled events");
        }
        Ok(events)
    }

    /// Closes the open channel, if any. Failures are only logged.
    async fn close_channel(&mut self) {
        let Some(channel) = self.channel.take() else {
            return;
        };
        match self.source.unsubscribe(channel).await {
            Ok(()) => tracing::debug!(%channel, "Closed event channel"),
            Err(e) => tracing::debug!(%channel, error = %e, "Failed to close event channel"),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

fn log_poll_error(error: &Error, delay: Duration) {
    let delay_ms = duration_ms(delay);
    if error.is_api() {
        tracing::debug!(error = %error, delay_ms, "Event poll failed, retrying");
    } else {
        tracing::warn!(error = %error, delay_ms, "Event poll failed, retrying");
    }
}
