// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sensors that pulse on for a fixed time when an event arrives.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::event::{LogEvent, names};
use crate::types::parse_flag;

/// The kinds of momentary sensors, each bound to its triggering events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MomentaryKind {
    /// Request-to-exit button (`RexActivated`).
    RequestToExit,
    /// Silent alarm (`SilentAlarm`).
    SilentAlarm,
    /// Card, code or mobile key rejected by the device.
    InvalidCredential,
}

impl MomentaryKind {
    /// Every kind, in display order.
    pub const ALL: [Self; 3] = [Self::RequestToExit, Self::SilentAlarm, Self::InvalidCredential];

    /// Returns how long the sensor stays on by default.
    #[must_use]
    pub const fn default_pulse(self) -> Duration {
        match self {
            Self::RequestToExit => Duration::from_secs(5),
            Self::SilentAlarm => Duration::from_secs(30),
            Self::InvalidCredential => Duration::from_secs(10),
        }
    }

    /// Returns the event types that can trigger this kind.
    #[must_use]
    pub fn event_types(self) -> &'static [&'static str] {
        match self {
            Self::RequestToExit => &[names::REX_ACTIVATED],
            Self::SilentAlarm => &[names::SILENT_ALARM],
            Self::InvalidCredential => &names::CREDENTIAL_EVENTS,
        }
    }

    /// Returns `true` if `event` triggers this kind.
    #[must_use]
    pub fn matches(self, event: &LogEvent) -> bool {
        if !self.event_types().contains(&event.name.as_str()) {
            return false;
        }
        match self {
            Self::RequestToExit | Self::SilentAlarm => true,
            Self::InvalidCredential => event.param("valid").and_then(parse_flag) == Some(false),
        }
    }
}

/// A binary sensor that turns on when a matching event arrives and off
/// again after its pulse duration.
///
/// Time is passed in explicitly so the sensor holds no timer of its own.
///
/// # Examples
///
/// ```
/// use tokio::time::{Duration, Instant};
/// use twonr_lib::event::LogEvent;
/// use twonr_lib::state::{MomentaryKind, MomentarySensor};
///
/// let mut rex = MomentarySensor::new(MomentaryKind::RequestToExit);
/// let now = Instant::now();
///
/// assert!(rex.observe(&LogEvent::new("RexActivated").with_id(1), now));
/// assert!(rex.is_on(now + Duration::from_secs(4)));
/// assert!(!rex.is_on(now + Duration::from_secs(5)));
/// ```
#[derive(Debug, Clone)]
pub struct MomentarySensor {
    kind: MomentaryKind,
    pulse: Duration,
    on_until: Option<Instant>,
    last_event: Option<LogEvent>,
}

impl MomentarySensor {
    /// Creates a sensor with the kind's default pulse.
    #[must_use]
    pub fn new(kind: MomentaryKind) -> Self {
        Self {
            kind,
            pulse: kind.default_pulse(),
            on_until: None,
            last_event: None,
        }
    }

    /// Sets the pulse duration.
    #[must_use]
    pub fn with_pulse(mut self, pulse: Duration) -> Self {
        self.pulse = pulse;
        self
    }

    /// Returns the sensor kind.
    #[must_use]
    pub fn kind(&self) -> MomentaryKind {
        self.kind
    }

    /// Returns the pulse duration.
    #[must_use]
    pub fn pulse(&self) -> Duration {
        self.pulse
    }

    /// Feeds an event observed at `now`.
    ///
    /// Returns `true` if the event turned the sensor on (or extended its
    /// pulse). Non-matching events and repeats of the last event id are
    /// ignored.
    pub fn observe(&mut self, event: &LogEvent, now: Instant) -> bool {
        if !self.kind.matches(event) {
            return false;
        }
        let last_id = self.last_event.as_ref().and_then(|e| e.id);
        if event.id.is_some() && event.id == last_id {
            return false;
        }

        self.last_event = Some(event.clone());
        self.on_until = Some(now + self.pulse);
        true
    }

    /// Returns `true` while the pulse started by the last match lasts.
    #[must_use]
    pub fn is_on(&self, now: Instant) -> bool {
        self.on_until.is_some_and(|until| now < until)
    }

    /// Returns the event that last turned the sensor on.
    #[must_use]
    pub fn last_event(&self) -> Option<&LogEvent> {
        self.last_event.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pulses() {
        assert_eq!(MomentaryKind::RequestToExit.default_pulse(), Duration::from_secs(5));
        assert_eq!(MomentaryKind::SilentAlarm.default_pulse(), Duration::from_secs(30));
        assert_eq!(
            MomentaryKind::InvalidCredential.default_pulse(),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn invalid_credential_predicate() {
        let kind = MomentaryKind::InvalidCredential;
        assert!(kind.matches(&LogEvent::new("CardEntered").with_param("valid", "no")));
        assert!(kind.matches(&LogEvent::new("MobKeyEntered").with_param("valid", false)));
        assert!(!kind.matches(&LogEvent::new("CodeEntered").with_param("valid", "true")));
        assert!(!kind.matches(&LogEvent::new("CodeEntered")));
        assert!(!kind.matches(&LogEvent::new("RexActivated").with_param("valid", false)));
    }

    #[test]
    fn pulse_expires() {
        let mut sensor =
            MomentarySensor::new(MomentaryKind::SilentAlarm).with_pulse(Duration::from_secs(2));
        let start = Instant::now();

        assert!(!sensor.is_on(start));
        assert!(sensor.observe(&LogEvent::new("SilentAlarm").with_id(3), start));
        assert!(sensor.is_on(start + Duration::from_secs(1)));
        assert!(!sensor.is_on(start + Duration::from_secs(2)));
        assert_eq!(sensor.last_event().and_then(|e| e.id), Some(3));
    }

    #[test]
    fn duplicate_id_is_ignored() {
        let mut sensor = MomentarySensor::new(MomentaryKind::RequestToExit);
        let start = Instant::now();
        let later = start + Duration::from_secs(4);

        assert!(sensor.observe(&LogEvent::new("RexActivated").with_id(9), start));
        assert!(!sensor.observe(&LogEvent::new("RexActivated").with_id(9), later));
        assert!(!sensor.is_on(start + Duration::from_secs(6)));

        assert!(sensor.observe(&LogEvent::new("RexActivated").with_id(10), later));
        assert!(sensor.is_on(start + Duration::from_secs(6)));
    }

    #[test]
    fn events_without_id_always_pulse() {
        let mut sensor = MomentarySensor::new(MomentaryKind::RequestToExit);
        let now = Instant::now();
        assert!(sensor.observe(&LogEvent::new("RexActivated"), now));
        assert!(sensor.observe(&LogEvent::new("RexActivated"), now));
    }

    #[test]
    fn other_events_are_ignored() {
        let mut sensor = MomentarySensor::new(MomentaryKind::RequestToExit);
        let now = Instant::now();
        assert!(!sensor.observe(&LogEvent::new("MotionDetected"), now));
        assert!(sensor.last_event().is_none());
    }
}
