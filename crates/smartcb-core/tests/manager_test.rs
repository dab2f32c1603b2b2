#![allow(clippy::unwrap_used)]
// Integration tests for `DeviceManager` and the scanner using wiremock.

use std::net::{Ipv4Addr, TcpListener};
use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use smartcb_core::discovery;
use smartcb_core::{
    CandidateSet, ConfigStore, ConnectionState, CoreError, DeviceEndpoint, DeviceManager,
    ManagerConfig, ScanOptions, StepOutcome, WallClock,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn endpoint_of(server: &MockServer) -> DeviceEndpoint {
    DeviceEndpoint::new(Ipv4Addr::LOCALHOST, server.address().port())
}

/// A loopback port with nothing listening on it.
fn closed_endpoint() -> DeviceEndpoint {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    DeviceEndpoint::new(Ipv4Addr::LOCALHOST, port)
}

fn manager_with_timeout(timeout: Duration) -> DeviceManager {
    let config = ManagerConfig {
        timeout,
        ..ManagerConfig::default()
    };
    DeviceManager::new(config, ConfigStore::default())
}

async fn mount_info(server: &MockServer, model: &str) {
    Mock::given(method("GET"))
        .and(path("/api/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": model,
            "firmware": "2.1.0"
        })))
        .mount(server)
        .await;
}

/// A breaker that answers every call the connect sequence makes.
async fn healthy_device() -> MockServer {
    let server = MockServer::start().await;
    mount_info(&server, "SmartCB-ESP32").await;
    Mock::given(method("GET"))
        .and(path("/api/settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "maxVoltage": 240,
            "maxCurrent": 20
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/schedules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "schedules": [
                {"id": 1, "onTime": "06:30", "offTime": "08:00", "days": [1, 2, 3, 4, 5]},
                {"onTime": "18:00", "offTime": "23:00", "days": [0, 6], "enabled": false}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/time"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .mount(&server)
        .await;
    server
}

// ── Scan ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_scan_finds_only_the_breaker() {
    let breaker = MockServer::start().await;
    mount_info(&breaker, "SmartCB-ESP32").await;
    let other = MockServer::start().await;
    mount_info(&other, "Tasmota").await;

    let candidates: CandidateSet = [endpoint_of(&breaker), endpoint_of(&other), closed_endpoint()]
        .into_iter()
        .collect();
    let manager = manager_with_timeout(Duration::from_secs(2));

    let result = manager.scan(&candidates).await.unwrap();

    assert_eq!(result.probed, 3);
    assert_eq!(result.devices.len(), 1);
    assert_eq!(result.devices[0].endpoint, endpoint_of(&breaker));
    assert_eq!(result.devices[0].model, "SmartCB-ESP32");
    assert_eq!(manager.state(), ConnectionState::Idle);
    assert!(manager.endpoint().is_none());
}

/// `count` breakers that answer `/api/info` only after five seconds.
async fn stalled_candidates(count: usize) -> (Vec<MockServer>, CandidateSet) {
    let mut servers = Vec::new();
    for _ in 0..count {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/info"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"model": "SmartCB-ESP32"}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;
        servers.push(server);
    }
    let candidates = servers.iter().map(endpoint_of).collect();
    (servers, candidates)
}

#[tokio::test]
async fn test_scan_duration_is_bounded_by_concurrency() {
    let (_servers, candidates) = stalled_candidates(8).await;
    let options = ScanOptions {
        probe_timeout: Duration::from_millis(300),
        concurrency: 8,
    };

    let started = Instant::now();
    let result = discovery::scan(&candidates, &options).await.unwrap();

    // All eight stall past the deadline: one round of timeouts, not eight.
    assert!(result.is_empty());
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_scan_duration_grows_with_probe_rounds() {
    let (_servers, candidates) = stalled_candidates(16).await;
    let options = ScanOptions {
        probe_timeout: Duration::from_millis(400),
        concurrency: 8,
    };

    let started = Instant::now();
    let result = discovery::scan(&candidates, &options).await.unwrap();
    let elapsed = started.elapsed();

    // 16 candidates at 8 in flight: two rounds of timeouts, not one and not 16.
    assert!(result.is_empty());
    assert_eq!(result.probed, 16);
    assert!(elapsed >= Duration::from_millis(750), "took {elapsed:?}");
    assert!(elapsed < Duration::from_secs(3), "took {elapsed:?}");
}

#[tokio::test]
async fn test_scan_while_connected_is_rejected() {
    let device = healthy_device().await;
    let manager = manager_with_timeout(Duration::from_secs(2));
    manager.connect(endpoint_of(&device)).await.unwrap();

    let err = manager.scan(&CandidateSet::new()).await.unwrap_err();

    assert!(matches!(
        err,
        CoreError::InvalidTransition {
            from: ConnectionState::Connected,
            to: ConnectionState::Scanning
        }
    ));
    assert_eq!(manager.state(), ConnectionState::Connected);
}

#[tokio::test]
async fn test_connect_during_scan_is_rejected() {
    let slow = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/info"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&slow)
        .await;

    let manager = DeviceManager::new(
        ManagerConfig {
            scan: ScanOptions {
                probe_timeout: Duration::from_secs(2),
                concurrency: 1,
            },
            ..ManagerConfig::default()
        },
        ConfigStore::default(),
    );
    let mut states = manager.subscribe();
    let candidates: CandidateSet = std::iter::once(endpoint_of(&slow)).collect();

    let scanning = manager.clone();
    let scan = tokio::spawn(async move { scanning.scan(&candidates).await });
    states
        .wait_for(|s| *s == ConnectionState::Scanning)
        .await
        .unwrap();

    let err = manager.connect(endpoint_of(&slow)).await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::InvalidTransition {
            from: ConnectionState::Scanning,
            to: ConnectionState::Connecting
        }
    ));

    scan.await.unwrap().unwrap();
    assert_eq!(manager.state(), ConnectionState::Idle);
}

// ── Connect / disconnect ────────────────────────────────────────────

#[tokio::test]
async fn test_connect_syncs_and_disconnect_clears() {
    let device = healthy_device().await;
    let manager = manager_with_timeout(Duration::from_secs(2));
    let endpoint = endpoint_of(&device);

    let report = manager.connect(endpoint).await.unwrap();

    assert_eq!(manager.state(), ConnectionState::Connected);
    assert_eq!(manager.endpoint(), Some(endpoint));
    assert!(!report.partial_failure());
    assert_eq!(report.settings, StepOutcome::Synced);
    assert_eq!(report.schedules, StepOutcome::Synced);
    assert_eq!(report.clock, StepOutcome::Synced);
    assert_eq!(report.device.firmware.as_deref(), Some("2.1.0"));

    let thresholds = manager.store().thresholds();
    assert!((thresholds.voltage.max - 240.0).abs() < f64::EPSILON);
    assert!((thresholds.current.max - 20.0).abs() < f64::EPSILON);
    // Not reported by the device: factory value kept.
    assert!((thresholds.voltage.min - 180.0).abs() < f64::EPSILON);

    let schedules = manager.store().schedules();
    assert_eq!(schedules.len(), 2);
    assert_eq!(schedules[0].id.as_str(), "1");
    assert_eq!(schedules[1].id.as_str(), "sched-1");

    manager.disconnect().unwrap();

    assert_eq!(manager.state(), ConnectionState::Idle);
    assert!(manager.endpoint().is_none());
    assert!(manager.last_report().is_none());
}

#[tokio::test]
async fn test_connect_pushes_wall_clock() {
    let server = MockServer::start().await;
    mount_info(&server, "SmartCB-ESP32").await;
    Mock::given(method("GET"))
        .and(path("/api/settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/schedules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/time"))
        .and(body_json(json!({"hour": 7, "minute": 30, "day": 2})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let manager = manager_with_timeout(Duration::from_secs(2));
    let clock = WallClock {
        hour: 7,
        minute: 30,
        weekday: 2,
    };

    let report = manager.connect_at(endpoint_of(&server), clock).await.unwrap();

    assert_eq!(report.clock, StepOutcome::Synced);
}

#[tokio::test]
async fn test_settings_timeout_is_partial_failure() {
    let server = MockServer::start().await;
    mount_info(&server, "SmartCB-ESP32").await;
    Mock::given(method("GET"))
        .and(path("/api/settings"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"maxVoltage": 100}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/schedules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/time"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .mount(&server)
        .await;

    let manager = manager_with_timeout(Duration::from_millis(500));

    let report = manager.connect(endpoint_of(&server)).await.unwrap();

    assert_eq!(manager.state(), ConnectionState::Connected);
    assert!(report.partial_failure());
    assert!(report.settings.is_failed());
    assert_eq!(report.schedules, StepOutcome::Synced);
    assert_eq!(report.clock, StepOutcome::Synced);
    assert_eq!(report.failures().len(), 1);
    // Local thresholds untouched.
    assert!((manager.store().thresholds().voltage.max - 250.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_rejected_clock_is_partial_failure() {
    let server = MockServer::start().await;
    mount_info(&server, "SmartCB-ESP32").await;
    Mock::given(method("GET"))
        .and(path("/api/settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/schedules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"onTime": "06:00", "offTime": "07:00", "days": [9]}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/time"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": false})))
        .mount(&server)
        .await;

    let manager = manager_with_timeout(Duration::from_secs(2));

    let report = manager.connect(endpoint_of(&server)).await.unwrap();

    assert_eq!(manager.state(), ConnectionState::Connected);
    assert_eq!(report.settings, StepOutcome::Synced);
    assert!(report.schedules.is_failed());
    assert!(report.clock.is_failed());
    assert!(manager.store().schedules().is_empty());
}

#[tokio::test]
async fn test_unreachable_device_fails_and_clears_endpoint() {
    let manager = manager_with_timeout(Duration::from_secs(2));

    let err = manager.connect(closed_endpoint()).await.unwrap_err();

    assert!(matches!(err, CoreError::ConnectionFailed { .. }));
    assert_eq!(manager.state(), ConnectionState::Failed);
    assert!(manager.endpoint().is_none());
}

#[tokio::test]
async fn test_handshake_timeout_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/info"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"model": "SmartCB-ESP32"}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let manager = manager_with_timeout(Duration::from_millis(300));

    let err = manager.connect(endpoint_of(&server)).await.unwrap_err();

    assert!(matches!(err, CoreError::Timeout { timeout_ms: 300 }));
    assert_eq!(manager.state(), ConnectionState::Failed);
    assert!(manager.endpoint().is_none());
}

#[tokio::test]
async fn test_foreign_device_is_unsupported() {
    let server = MockServer::start().await;
    mount_info(&server, "Shelly-Plug").await;
    let manager = manager_with_timeout(Duration::from_secs(2));

    let err = manager.connect(endpoint_of(&server)).await.unwrap_err();

    assert!(matches!(err, CoreError::UnsupportedDevice { .. }));
    assert_eq!(manager.state(), ConnectionState::Failed);
    assert!(manager.endpoint().is_none());
}

#[tokio::test]
async fn test_dropped_connect_leaves_failed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/info"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;
    let manager = manager_with_timeout(Duration::from_secs(10));

    let outcome =
        tokio::time::timeout(Duration::from_millis(200), manager.connect(endpoint_of(&server)))
            .await;

    assert!(outcome.is_err());
    assert_eq!(manager.state(), ConnectionState::Failed);
    assert!(manager.endpoint().is_none());
}

#[tokio::test]
async fn test_failed_then_reconnect_elsewhere() {
    let manager = manager_with_timeout(Duration::from_secs(2));
    manager.connect(closed_endpoint()).await.unwrap_err();
    assert_eq!(manager.state(), ConnectionState::Failed);

    let first = healthy_device().await;
    let second = healthy_device().await;
    manager.connect(endpoint_of(&first)).await.unwrap();
    manager.connect(endpoint_of(&second)).await.unwrap();

    assert_eq!(manager.state(), ConnectionState::Connected);
    assert_eq!(manager.endpoint(), Some(endpoint_of(&second)));
}

// ── Device operations ───────────────────────────────────────────────

#[tokio::test]
async fn test_read_and_switch_after_connect() {
    let device = healthy_device().await;
    Mock::given(method("GET"))
        .and(path("/api/data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "voltage": 229.5,
            "current": 3.2,
            "power": 700.1,
            "energy": 1.25,
            "frequency": 50.02,
            "powerFactor": 0.95,
            "relayState": true
        })))
        .mount(&device)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/relay"))
        .and(body_json(json!({"state": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&device)
        .await;

    let manager = manager_with_timeout(Duration::from_secs(2));
    manager.connect(endpoint_of(&device)).await.unwrap();

    let reading = manager.read_current().await.unwrap();
    assert!((reading.voltage - 229.5).abs() < f64::EPSILON);
    assert!(reading.relay_on);

    manager.set_relay(false).await.unwrap();
}

#[tokio::test]
async fn test_push_thresholds_validates_before_sending() {
    let device = healthy_device().await;
    Mock::given(method("POST"))
        .and(path("/api/settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&device)
        .await;

    let manager = manager_with_timeout(Duration::from_secs(2));
    manager.connect(endpoint_of(&device)).await.unwrap();

    let mut bad = *manager.store().thresholds();
    bad.voltage.min = 300.0;
    assert!(matches!(
        manager.push_thresholds(bad).await,
        Err(CoreError::ValidationFailed { .. })
    ));

    let mut good = *manager.store().thresholds();
    good.current.max = 10.0;
    manager.push_thresholds(good).await.unwrap();
    assert!((manager.store().thresholds().current.max - 10.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_resync_requires_connection_and_repulls() {
    let manager = manager_with_timeout(Duration::from_secs(2));
    assert!(matches!(
        manager.resync().await,
        Err(CoreError::NotConnected)
    ));

    let device = healthy_device().await;
    let first = manager.connect(endpoint_of(&device)).await.unwrap();
    let version = manager.store().version();

    let again = manager.resync().await.unwrap();
    assert_eq!(again.endpoint, first.endpoint);
    assert_eq!(again.device, first.device);
    assert_eq!(again.settings, StepOutcome::Synced);
    assert!(again.completed_at >= first.completed_at);
    assert!(manager.store().version() > version);
    assert_eq!(manager.state(), ConnectionState::Connected);
}
