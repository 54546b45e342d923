// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for sessions and the event engine against a mock device.

use std::time::Duration;

use serde_json::json;
use twonr_lib::event::DEFAULT_EVENT_FILTER;
use twonr_lib::protocol::HttpConfig;
use twonr_lib::state::MomentaryKind;
use twonr_lib::types::{CameraSource, Resolution};
use twonr_lib::{IntercomEvent, Session, SessionOptions};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ok(result: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "success": true, "result": result }))
}

/// Mounts the requests every session makes while connecting.
async fn mount_identity(server: &MockServer, log_caps: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/api/system/info"))
        .respond_with(ok(json!({
            "deviceName": "Main entrance",
            "variant": "2N IP Verso",
            "serialNumber": "54-1234-5678",
            "macAddr": "7c-1e-b3-eb-40-a9"
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/switch/caps"))
        .respond_with(ok(json!({
            "switches": [
                {"switch": 1, "enabled": true, "mode": "monostable"},
                {"switch": 2, "enabled": true, "mode": "bistable"}
            ]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/switch/status"))
        .respond_with(ok(json!({
            "switches": [
                {"switch": 1, "active": false},
                {"switch": 2, "active": true}
            ]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/log/caps"))
        .respond_with(log_caps)
        .mount(server)
        .await;
}

/// Mounts an empty long poll answered after a short wait.
async fn mount_idle_pull(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/log/pull"))
        .respond_with(ok(json!({"events": []})).set_delay(Duration::from_secs(2)))
        .mount(server)
        .await;
}

async fn connect(server: &MockServer, options: SessionOptions) -> Session {
    Session::connect(
        HttpConfig::new(server.uri()).with_digest_auth("admin", "2n"),
        options,
    )
    .await
    .unwrap()
}

// ============================================================================
// Event delivery
// ============================================================================

mod events {
    use super::*;

    #[tokio::test]
    async fn pulled_events_update_state_and_notify() {
        let server = MockServer::start().await;
        mount_identity(
            &server,
            ok(json!({"events": ["MotionDetected", "CardEntered", "SwitchStateChanged"]})),
        )
        .await;

        Mock::given(method("GET"))
            .and(path("/api/log/subscribe"))
            .and(query_param(
                "filter",
                "MotionDetected,SwitchStateChanged,CardEntered",
            ))
            .and(query_param("include", "new"))
            .and(query_param("duration", "3600"))
            .respond_with(ok(json!({"id": 42})))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/log/pull"))
            .and(query_param("id", "42"))
            .respond_with(
                ok(json!({
                    "events": [
                        {"id": 1, "utcTime": 1_700_000_000, "upTime": 50, "event": "MotionDetected", "params": {"state": "in"}},
                        {"id": 2, "utcTime": 1_700_000_001, "upTime": 51, "event": "CardEntered", "params": {"direction": "in", "uid": "04A1B2C3", "valid": false}},
                        {"id": 3, "utcTime": 1_700_000_002, "upTime": 52, "event": "SwitchStateChanged", "params": {"switch": 1, "state": true}}
                    ]
                }))
                .set_delay(Duration::from_millis(300)),
            )
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        mount_idle_pull(&server).await;

        Mock::given(method("GET"))
            .and(path("/api/log/unsubscribe"))
            .and(query_param("id", "42"))
            .respond_with(ok(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let session = connect(&server, SessionOptions::default()).await;
        let mut events = session.subscribe();

        assert!(session.is_listening());
        assert_eq!(session.switch_active(1), Some(false));
        assert_eq!(session.switch_active(2), Some(true));

        let mut received = Vec::new();
        while received.len() < 5 {
            let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
                .await
                .expect("notification in time")
                .unwrap();
            received.push(event);
        }

        let names: Vec<&str> = received.iter().map(IntercomEvent::name).collect();
        assert_eq!(
            names,
            vec![
                "MotionDetected",
                "CardEnteredInvalid",
                "CardEntered",
                "SwitchStateChanged",
                "SwitchStateChanged",
            ]
        );
        assert!(matches!(
            received[3],
            IntercomEvent::SwitchChanged {
                switch: 1,
                active: true
            }
        ));

        let state = session.state();
        assert!(state.motion);
        assert_eq!(state.switch_active(1), Some(true));
        assert_eq!(
            state.last_invalid.as_ref().map(|e| e.name.as_str()),
            Some("CardEnteredInvalid")
        );
        assert_eq!(session.switch_active(1), Some(true));

        assert!(session.sensor_is_on(MomentaryKind::InvalidCredential));
        assert!(!session.sensor_is_on(MomentaryKind::RequestToExit));
        assert_eq!(
            session
                .sensor_last_event(MomentaryKind::InvalidCredential)
                .and_then(|e| e.id),
            Some(2)
        );

        session.shutdown().await;
    }

    #[tokio::test]
    async fn callbacks_see_updated_state() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicBool, Ordering};
        use twonr_lib::subscription::Subscribable;

        let server = MockServer::start().await;
        mount_identity(&server, ok(json!({"events": ["DoorStateChanged"]}))).await;

        Mock::given(method("GET"))
            .and(path("/api/log/subscribe"))
            .and(query_param("filter", "DoorStateChanged"))
            .respond_with(ok(json!({"id": 7})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/log/pull"))
            .respond_with(
                ok(json!({
                    "events": [
                        {"id": 10, "event": "DoorStateChanged", "params": {"door": 1, "state": "opened"}}
                    ]
                }))
                .set_delay(Duration::from_millis(300)),
            )
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        mount_idle_pull(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/log/unsubscribe"))
            .respond_with(ok(json!({})))
            .mount(&server)
            .await;

        let session = connect(&server, SessionOptions::default()).await;
        let mut watch = session.watch_state();

        let door_seen = Arc::new(AtomicBool::new(false));
        let door_seen_clone = Arc::clone(&door_seen);
        session.on_event(move |event, state| {
            if event.name == "DoorStateChanged" && state.door_open {
                door_seen_clone.store(true, Ordering::SeqCst);
            }
        });

        tokio::time::timeout(Duration::from_secs(5), watch.wait_for(|s| s.door_open))
            .await
            .expect("door state in time")
            .unwrap();
        assert!(door_seen.load(Ordering::SeqCst));

        session.shutdown().await;
    }
}

// ============================================================================
// Event filter negotiation
// ============================================================================

mod negotiation {
    use super::*;

    #[tokio::test]
    async fn caps_failure_uses_configured_filter() {
        let server = MockServer::start().await;
        mount_identity(&server, ResponseTemplate::new(404)).await;

        Mock::given(method("GET"))
            .and(path("/api/log/subscribe"))
            .and(query_param("filter", DEFAULT_EVENT_FILTER.join(",")))
            .respond_with(ok(json!({"id": 9})))
            .expect(1)
            .mount(&server)
            .await;
        mount_idle_pull(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/log/unsubscribe"))
            .respond_with(ok(json!({})))
            .mount(&server)
            .await;

        let session = connect(&server, SessionOptions::default()).await;
        assert!(session.log_capabilities().is_empty());
        assert_eq!(session.event_filter(), DEFAULT_EVENT_FILTER);
        assert!(session.is_listening());

        // Let the engine reach its first pull
        tokio::time::sleep(Duration::from_millis(300)).await;
        session.shutdown().await;
    }

    #[tokio::test]
    async fn no_supported_event_does_not_listen() {
        let server = MockServer::start().await;
        mount_identity(&server, ok(json!({"events": ["UserAuthenticated"]}))).await;

        Mock::given(method("GET"))
            .and(path("/api/log/subscribe"))
            .respond_with(ok(json!({"id": 1})))
            .expect(0)
            .mount(&server)
            .await;

        let session = connect(&server, SessionOptions::default()).await;
        assert!(session.event_filter().is_empty());
        assert!(!session.is_listening());
        assert!(session.supports_event("UserAuthenticated"));
        assert!(!session.supports_event("MotionDetected"));

        tokio::time::sleep(Duration::from_millis(200)).await;
        session.shutdown().await;
    }

    #[tokio::test]
    async fn switch_status_failure_fails_connect() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/system/info"))
            .respond_with(ok(json!({"deviceName": "Gate"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/switch/caps"))
            .respond_with(ok(json!({"switches": []})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/log/caps"))
            .respond_with(ok(json!({"events": []})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/switch/status"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = Session::connect(HttpConfig::new(server.uri()), SessionOptions::default()).await;
        assert!(result.is_err());
    }
}

// ============================================================================
// Switches and camera
// ============================================================================

mod control {
    use super::*;

    fn no_events() -> SessionOptions {
        SessionOptions {
            event_filter: Vec::new(),
            ..SessionOptions::default()
        }
    }

    #[tokio::test]
    async fn release_door_uses_configured_switch() {
        let server = MockServer::start().await;
        mount_identity(&server, ok(json!({"events": []}))).await;

        Mock::given(method("GET"))
            .and(path("/api/switch/ctrl"))
            .and(query_param("switch", "2"))
            .and(query_param("action", "trigger"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;

        let options = SessionOptions {
            door_release_switch: 2,
            ..no_events()
        };
        let session = connect(&server, options).await;
        session.release_door().await.unwrap();
        session.shutdown().await;
    }

    /// Answers the first switch status read with switch 1 idle and later
    /// ones with it active.
    async fn mount_switch_turning_on(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/api/switch/status"))
            .respond_with(ok(json!({"switches": [{"switch": 1, "active": false}]})))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/switch/status"))
            .respond_with(ok(json!({"switches": [{"switch": 1, "active": true}]})))
            .with_priority(2)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn trigger_refreshes_switch_status() {
        let server = MockServer::start().await;
        mount_identity(&server, ok(json!({"events": []}))).await;
        mount_switch_turning_on(&server).await;

        Mock::given(method("GET"))
            .and(path("/api/switch/ctrl"))
            .and(query_param("switch", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;

        let options = SessionOptions {
            switch_poll_seconds: 0,
            ..no_events()
        };
        let session = connect(&server, options).await;
        assert_eq!(session.switch_active(1), Some(false));

        session.release_door().await.unwrap();
        assert_eq!(session.switch_active(1), Some(true));

        session.shutdown().await;
    }

    #[tokio::test]
    async fn switch_status_is_polled() {
        let server = MockServer::start().await;
        mount_identity(&server, ok(json!({"events": []}))).await;
        mount_switch_turning_on(&server).await;

        let options = SessionOptions {
            switch_poll_seconds: 1,
            ..no_events()
        };
        let session = connect(&server, options).await;
        let mut watch = session.watch_state();
        assert_eq!(session.switch_active(1), Some(false));

        tokio::time::timeout(
            Duration::from_secs(5),
            watch.wait_for(|s| s.switch_active(1) == Some(true)),
        )
        .await
        .expect("switch poll in time")
        .unwrap();
        assert_eq!(session.switch_active(1), Some(true));

        session.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_stops_switch_poll() {
        let server = MockServer::start().await;
        mount_identity(&server, ok(json!({"events": []}))).await;

        let options = SessionOptions {
            switch_poll_seconds: 1,
            ..no_events()
        };
        let session = connect(&server, options).await;
        session.shutdown().await;

        let before = server.received_requests().await.unwrap_or_default().len();
        tokio::time::sleep(Duration::from_millis(2500)).await;
        let after = server.received_requests().await.unwrap_or_default().len();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn camera_caps_read_once() {
        let server = MockServer::start().await;
        mount_identity(&server, ok(json!({"events": []}))).await;

        Mock::given(method("GET"))
            .and(path("/api/camera/caps"))
            .respond_with(ok(json!({
                "resolutions": [
                    {"width": 320, "height": 240},
                    {"width": 1280, "height": 960},
                    {"width": 640, "height": 480}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/camera/snapshot"))
            .and(query_param("width", "1280"))
            .and(query_param("height", "960"))
            .and(query_param("source", "internal"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0xFF, 0xD8], "image/jpeg"))
            .expect(1)
            .mount(&server)
            .await;

        let session = connect(&server, no_events()).await;

        assert_eq!(session.camera_resolutions().await.len(), 3);
        assert_eq!(
            session.select_resolution(None).await,
            Resolution::new(640, 480)
        );
        assert_eq!(
            session
                .select_resolution(Some(Resolution::new(1920, 1080)))
                .await,
            Resolution::new(1280, 960)
        );

        let jpeg = session
            .snapshot(Some(Resolution::new(800, 600)), CameraSource::Internal)
            .await
            .unwrap();
        assert_eq!(jpeg.as_ref(), &[0xFF, 0xD8]);

        session.shutdown().await;
    }

    #[tokio::test]
    async fn rtsp_url_carries_credentials() {
        let server = MockServer::start().await;
        mount_identity(&server, ok(json!({"events": []}))).await;

        let session = connect(&server, no_events()).await;
        let url = session.rtsp_url();
        assert!(url.starts_with("rtsp://admin:2n@127.0.0.1:554/"));
        assert!(url.ends_with("/h264_stream"));

        session.shutdown().await;
    }
}
