// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A connected intercom with its event engine running.
//!
//! [`Session::connect`] identifies the device, reads its switch and event
//! capabilities, seeds the switch state and starts the event engine.
//! [`Session::shutdown`] stops the engine and closes its channel.
//!
//! ```no_run
//! use twonr_lib::protocol::HttpConfig;
//! use twonr_lib::state::MomentaryKind;
//! use twonr_lib::{Session, SessionOptions};
//!
//! # async fn example() -> twonr_lib::Result<()> {
//! let session = Session::connect(
//!     HttpConfig::new("192.168.1.50").with_digest_auth("admin", "2n"),
//!     SessionOptions::default(),
//! )
//! .await?;
//!
//! println!("Connected to {}", session.info().title);
//! session.release_door().await?;
//!
//! if session.sensor_is_on(MomentaryKind::RequestToExit) {
//!     println!("Exit button pressed");
//! }
//!
//! session.shutdown().await;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{OnceCell, broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::device::Device;
use crate::error::Result;
use crate::event::{DEFAULT_EVENT_FILTER, EngineConfig, EventEngine, IntercomEvent, LogEvent};
use crate::protocol::{ByteStream, HttpConfig};
use crate::response::{DeviceInfo, SwitchCapability};
use crate::state::{DerivedState, MomentaryKind, MomentarySensor, StateStore};
use crate::subscription::{Subscribable, SubscriptionId};
use crate::types::{CameraSource, Resolution, select_resolution};

/// Per-session settings.
///
/// Deserializable with every field optional, so it can be read from a
/// configuration file.
///
/// # Examples
///
/// ```
/// use twonr_lib::SessionOptions;
///
/// let options: SessionOptions =
///     serde_json::from_str(r#"{"door_release_switch": 2, "rtsp_stream": "h265_stream"}"#)
///         .unwrap();
///
/// assert_eq!(options.door_release_switch, 2);
/// assert_eq!(options.rtsp_port, 554);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    /// Switch fired by [`Session::release_door`].
    pub door_release_switch: u32,
    /// Pulse of the request-to-exit sensor, in seconds.
    pub pulse_rex_seconds: u64,
    /// Pulse of the silent alarm sensor, in seconds.
    pub pulse_silent_alarm_seconds: u64,
    /// Pulse of the invalid credential sensor, in seconds.
    pub pulse_invalid_credential_seconds: u64,
    /// RTSP stream path (`h264_stream`, `h265_stream`, `mjpeg_stream`).
    pub rtsp_stream: String,
    /// RTSP port.
    pub rtsp_port: u16,
    /// Frame rate requested for MJPEG streams.
    pub mjpeg_fps: u8,
    /// Event types wanted, narrowed to what the device supports.
    pub event_filter: Vec<String>,
    /// Period of the switch status poll, in seconds. 0 disables polling.
    pub switch_poll_seconds: u64,
}

impl SessionOptions {
    /// Returns the configured pulse of a momentary sensor.
    #[must_use]
    pub fn pulse(&self, kind: MomentaryKind) -> Duration {
        Duration::from_secs(match kind {
            MomentaryKind::RequestToExit => self.pulse_rex_seconds,
            MomentaryKind::SilentAlarm => self.pulse_silent_alarm_seconds,
            MomentaryKind::InvalidCredential => self.pulse_invalid_credential_seconds,
        })
    }

    /// Returns the switch status poll period, `None` when disabled.
    #[must_use]
    pub fn switch_poll_interval(&self) -> Option<Duration> {
        (self.switch_poll_seconds > 0).then(|| Duration::from_secs(self.switch_poll_seconds))
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            door_release_switch: 1,
            pulse_rex_seconds: MomentaryKind::RequestToExit.default_pulse().as_secs(),
            pulse_silent_alarm_seconds: MomentaryKind::SilentAlarm.default_pulse().as_secs(),
            pulse_invalid_credential_seconds: MomentaryKind::InvalidCredential
                .default_pulse()
                .as_secs(),
            rtsp_stream: "h264_stream".to_string(),
            rtsp_port: 554,
            mjpeg_fps: 10,
            event_filter: DEFAULT_EVENT_FILTER.iter().map(ToString::to_string).collect(),
            switch_poll_seconds: 5,
        }
    }
}

/// Keeps the wanted event types the device supports, in the wanted order.
///
/// Unknown capabilities (empty set) keep the whole list.
fn negotiate_filter(wanted: &[String], caps: &BTreeSet<String>) -> Vec<String> {
    if caps.is_empty() {
        return wanted.to_vec();
    }
    wanted.iter().filter(|e| caps.contains(*e)).cloned().collect()
}

/// Re-reads `/api/switch/status` into the state store.
async fn refresh_switches(device: &Device, store: &StateStore) -> Result<()> {
    let status = device.switch_status().await?;
    store.seed_switches(status.iter().map(|s| (s.id, s.active)));
    Ok(())
}

/// Background task polling switch status at a fixed period.
#[derive(Debug)]
struct SwitchPoller {
    cancellation: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SwitchPoller {
    fn spawn(device: Device, store: StateStore, period: Duration) -> Self {
        let cancellation = CancellationToken::new();
        let cancel = cancellation.clone();

        let task = tokio::spawn(async move {
            let mut ticks = tokio::time::interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticks.tick() => {}
                }
                tokio::select! {
                    () = cancel.cancelled() => break,
                    result = refresh_switches(&device, &store) => {
                        if let Err(e) = result {
                            tracing::debug!(error = %e, "Switch status poll failed");
                        }
                    }
                }
            }
        });

        Self {
            cancellation,
            task: Some(task),
        }
    }

    async fn stop(&mut self) {
        self.cancellation.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            tracing::warn!(error = %e, "Switch poller task failed");
        }
    }
}

impl Drop for SwitchPoller {
    fn drop(&mut self) {
        self.cancellation.cancel();
    }
}

/// An intercom connection with its identity, capabilities and event engine.
#[derive(Debug)]
pub struct Session {
    config: HttpConfig,
    device: Device,
    options: SessionOptions,
    info: DeviceInfo,
    switches: Vec<SwitchCapability>,
    log_caps: BTreeSet<String>,
    event_filter: Vec<String>,
    engine: EventEngine<Device>,
    sensors: Arc<Mutex<Vec<MomentarySensor>>>,
    resolutions: OnceCell<Vec<Resolution>>,
    switch_poller: Option<SwitchPoller>,
}

impl Session {
    /// Connects to a device and starts listening to its events.
    ///
    /// Event capabilities are optional: if `/api/log/caps` fails, the
    /// configured filter is used as is. The engine is not started when no
    /// wanted event type is supported.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid or the device info,
    /// switch capabilities or switch status cannot be read.
    pub async fn connect(config: HttpConfig, options: SessionOptions) -> Result<Self> {
        let device = Device::connect(config.clone())?;

        let info = device.device_info().await?;
        let switches = device.switch_capabilities().await?;
        tracing::info!(
            title = %info.title,
            serial = info.serial.as_deref().unwrap_or("-"),
            switches = switches.len(),
            "Connected to intercom"
        );

        let log_caps: BTreeSet<String> = match device.log_capabilities().await {
            Ok(caps) => caps.into_iter().collect(),
            Err(e) => {
                tracing::debug!(error = %e, "Event capabilities unavailable, using configured filter");
                BTreeSet::new()
            }
        };
        let event_filter = negotiate_filter(&options.event_filter, &log_caps);

        let mut engine = EventEngine::new(
            device.clone(),
            EngineConfig::default().with_filter(event_filter.clone()),
        );
        refresh_switches(&device, engine.state_store()).await?;

        let sensors: Arc<Mutex<Vec<MomentarySensor>>> = Arc::new(Mutex::new(
            MomentaryKind::ALL
                .iter()
                .map(|&kind| MomentarySensor::new(kind).with_pulse(options.pulse(kind)))
                .collect(),
        ));
        let sensors_clone = Arc::clone(&sensors);
        engine.on_event(move |event, _state| {
            let now = Instant::now();
            for sensor in sensors_clone.lock().iter_mut() {
                sensor.observe(event, now);
            }
        });

        if event_filter.is_empty() {
            tracing::info!("Device supports none of the wanted events, not listening");
        } else {
            engine.start();
        }

        let switch_poller = options.switch_poll_interval().map(|period| {
            SwitchPoller::spawn(device.clone(), engine.state_store().clone(), period)
        });

        Ok(Self {
            config,
            device,
            options,
            info,
            switches,
            log_caps,
            event_filter,
            engine,
            sensors,
            resolutions: OnceCell::new(),
            switch_poller,
        })
    }

    /// Stops the switch poll and the event engine, closing its channel.
    pub async fn shutdown(mut self) {
        if let Some(poller) = self.switch_poller.as_mut() {
            poller.stop().await;
        }
        self.engine.stop().await;
    }

    /// Returns the device facade.
    #[must_use]
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Returns the session options.
    #[must_use]
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Returns the device identity read at connection.
    #[must_use]
    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    /// Returns the switch configuration read at connection.
    #[must_use]
    pub fn switch_capabilities(&self) -> &[SwitchCapability] {
        &self.switches
    }

    /// Returns the event types the device reported, empty if unknown.
    #[must_use]
    pub fn log_capabilities(&self) -> &BTreeSet<String> {
        &self.log_caps
    }

    /// Returns the event types the engine subscribes to.
    #[must_use]
    pub fn event_filter(&self) -> &[String] {
        &self.event_filter
    }

    /// Returns `true` if the device can report `event`, or if its
    /// capabilities are unknown.
    #[must_use]
    pub fn supports_event(&self, event: &str) -> bool {
        self.log_caps.is_empty() || self.log_caps.contains(event)
    }

    /// Returns the event engine.
    #[must_use]
    pub fn engine(&self) -> &EventEngine<Device> {
        &self.engine
    }

    /// Returns `true` while events are being received.
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.engine.is_running()
    }

    // ========== State ==========

    /// Returns a copy of the derived state.
    #[must_use]
    pub fn state(&self) -> DerivedState {
        self.engine.state()
    }

    /// Returns a receiver notified after every event.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<DerivedState> {
        self.engine.watch_state()
    }

    /// Returns a receiver of engine notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<IntercomEvent> {
        self.engine.subscribe()
    }

    /// Returns whether a momentary sensor is currently on.
    #[must_use]
    pub fn sensor_is_on(&self, kind: MomentaryKind) -> bool {
        let now = Instant::now();
        self.sensors
            .lock()
            .iter()
            .any(|s| s.kind() == kind && s.is_on(now))
    }

    /// Returns the event that last turned a momentary sensor on.
    #[must_use]
    pub fn sensor_last_event(&self, kind: MomentaryKind) -> Option<LogEvent> {
        self.sensors
            .lock()
            .iter()
            .find(|s| s.kind() == kind)
            .and_then(|s| s.last_event().cloned())
    }

    // ========== Switches ==========

    /// Returns whether a switch is active, as last read or reported.
    #[must_use]
    pub fn switch_active(&self, switch: u32) -> Option<bool> {
        self.engine.state_store().snapshot().switch_active(switch)
    }

    /// Re-reads every switch state from the device.
    ///
    /// Also runs every [`SessionOptions::switch_poll_seconds`] in the
    /// background.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn refresh_switch_status(&self) -> Result<()> {
        refresh_switches(&self.device, self.engine.state_store()).await
    }

    /// Fires a switch, then re-reads the switch states.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the device rejects it. A
    /// failed status refresh afterwards is only logged.
    pub async fn trigger_switch(&self, switch: u32) -> Result<()> {
        self.device.trigger_switch(switch).await?;
        if let Err(e) = self.refresh_switch_status().await {
            tracing::debug!(switch, error = %e, "Switch status refresh after trigger failed");
        }
        Ok(())
    }

    /// Fires the configured door release switch.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the device rejects it.
    pub async fn release_door(&self) -> Result<()> {
        self.trigger_switch(self.options.door_release_switch).await
    }

    // ========== Camera ==========

    /// Returns the supported snapshot resolutions, read once per session.
    pub async fn camera_resolutions(&self) -> &[Resolution] {
        self.resolutions
            .get_or_init(|| self.device.camera_capabilities())
            .await
    }

    /// Picks the smallest supported resolution covering `requested`
    /// (640x480 when `None`), else the largest supported one.
    pub async fn select_resolution(&self, requested: Option<Resolution>) -> Resolution {
        let requested = requested.unwrap_or(Resolution::DEFAULT_REQUEST);
        select_resolution(self.camera_resolutions().await, requested).unwrap_or(requested)
    }

    /// Fetches a JPEG snapshot at the best matching resolution.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn snapshot(
        &self,
        requested: Option<Resolution>,
        source: CameraSource,
    ) -> Result<Bytes> {
        let resolution = self.select_resolution(requested).await;
        self.device.snapshot(resolution, source).await
    }

    /// Opens an MJPEG stream at the best matching resolution and the
    /// configured frame rate.
    ///
    /// # Errors
    ///
    /// Returns error if the stream cannot be opened.
    pub async fn open_mjpeg_stream(
        &self,
        requested: Option<Resolution>,
        source: CameraSource,
    ) -> Result<ByteStream> {
        let resolution = self.select_resolution(requested).await;
        self.device
            .open_snapshot_stream(resolution, self.options.mjpeg_fps, source)
            .await
    }

    /// Returns the RTSP URL of the configured stream, with credentials.
    #[must_use]
    pub fn rtsp_url(&self) -> String {
        rtsp_url(&self.config, &self.options)
    }
}

fn rtsp_url(config: &HttpConfig, options: &SessionOptions) -> String {
    let user_info = config
        .credentials()
        .filter(|c| !c.username().is_empty() && !c.password().is_empty())
        .map(|c| {
            format!(
                "{}:{}@",
                urlencoding::encode(c.username()),
                urlencoding::encode(c.password())
            )
        })
        .unwrap_or_default();

    format!(
        "rtsp://{user_info}{}:{}/{}",
        config.host_name(),
        options.rtsp_port,
        options.rtsp_stream.trim_matches('/')
    )
}

impl Subscribable for Session {
    fn on_event<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&LogEvent, &DerivedState) + Send + Sync + 'static,
    {
        self.engine.on_event(callback)
    }

    fn on_invalid_credential<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&LogEvent, &DerivedState) + Send + Sync + 'static,
    {
        self.engine.on_invalid_credential(callback)
    }

    fn on_switch_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(u32, bool) + Send + Sync + 'static,
    {
        self.engine.on_switch_changed(callback)
    }

    fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&DerivedState) + Send + Sync + 'static,
    {
        self.engine.on_state_changed(callback)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.engine.unsubscribe(id)
    }
}
