#![allow(clippy::unwrap_used)]
// Integration tests for `DeviceClient` using wiremock.

use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use smartcb_api::{DeviceClient, Error, TimeSet, TransportConfig, WireSettings};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, DeviceClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = DeviceClient::new(base_url, &TransportConfig::default()).unwrap();
    (server, client)
}

// ── Info / probe ────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_info() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "SmartCB-ESP32",
            "firmware": "2.1.0",
            "mac": "24:6f:28:aa:bb:cc"
        })))
        .mount(&server)
        .await;

    let info = client.get_info().await.unwrap();

    assert_eq!(info.model, "SmartCB-ESP32");
    assert_eq!(info.firmware.as_deref(), Some("2.1.0"));
    assert!(info.is_supported());
}

#[tokio::test]
async fn test_probe_finds_matching_model() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"model": "SmartCB-ESP32"})))
        .mount(&server)
        .await;

    let outcome = client.probe(Duration::from_secs(1)).await;

    assert!(outcome.present);
    assert_eq!(outcome.model.as_deref(), Some("SmartCB-ESP32"));
}

#[tokio::test]
async fn test_probe_ignores_foreign_device() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"model": "Shelly-Plug"})))
        .mount(&server)
        .await;

    let outcome = client.probe(Duration::from_secs(1)).await;

    assert!(!outcome.present);
    assert!(outcome.model.is_none());
}

#[tokio::test]
async fn test_probe_treats_malformed_and_error_status_as_absent() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/info"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>router login</html>"))
        .mount(&server)
        .await;

    assert!(!client.probe(Duration::from_secs(1)).await.present);

    server.reset().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    assert!(!client.probe(Duration::from_secs(1)).await.present);
}

#[tokio::test]
async fn test_probe_enforces_deadline() {
    let server = MockServer::start().await;
    // Generous client timeout: the probe deadline alone must cut the request.
    let client = DeviceClient::new(
        Url::parse(&server.uri()).unwrap(),
        &TransportConfig {
            timeout: Duration::from_secs(30),
            connect_timeout: None,
        },
    )
    .unwrap();

    Mock::given(method("GET"))
        .and(path("/api/info"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"model": "SmartCB-ESP32"}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let started = Instant::now();
    let outcome = client.probe(Duration::from_millis(200)).await;

    assert!(!outcome.present);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_probe_unreachable_host_is_absent() {
    // Port 9 on loopback (discard) is closed in test environments.
    let client = DeviceClient::new(
        Url::parse("http://127.0.0.1:9/").unwrap(),
        &TransportConfig::probe(Duration::from_millis(300)),
    )
    .unwrap();

    assert!(!client.probe(Duration::from_millis(300)).await.present);
}

// ── Settings / schedules ────────────────────────────────────────────

#[tokio::test]
async fn test_get_settings_partial() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "minVoltage": 190,
            "maxCurrent": 20.5,
            "frequencyProtection": false
        })))
        .mount(&server)
        .await;

    let settings = client.get_settings().await.unwrap();

    assert_eq!(
        settings,
        WireSettings {
            min_voltage: Some(190.0),
            max_current: Some(20.5),
            frequency_protection: Some(false),
            ..WireSettings::default()
        }
    );
}

#[tokio::test]
async fn test_get_schedules_wrapped() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/schedules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "schedules": [
                {"id": 1, "onTime": "06:30", "offTime": "07:15", "days": [1, 2, 3, 4, 5], "enabled": true},
                {"onTime": "22:00", "offTime": "23:00", "days": [0, 6], "enabled": false}
            ]
        })))
        .mount(&server)
        .await;

    let schedules = client.get_schedules().await.unwrap();

    assert_eq!(schedules.len(), 2);
    assert_eq!(schedules[0].on_time, "06:30");
    assert!(schedules[1].id.is_none());
    assert!(!schedules[1].enabled);
}

#[tokio::test]
async fn test_update_settings_sends_only_present_fields() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/settings"))
        .and(body_json(json!({"maxVoltage": 245.0})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    client
        .update_settings(&WireSettings {
            max_voltage: Some(245.0),
            ..WireSettings::default()
        })
        .await
        .unwrap();
}

// ── Time / relay ────────────────────────────────────────────────────

#[tokio::test]
async fn test_set_time_posts_hour_minute_day() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/time"))
        .and(body_json(json!({"hour": 14, "minute": 5, "day": 0})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    client
        .set_time(TimeSet {
            hour: 14,
            minute: 5,
            day: 0,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_set_time_rejected() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/time"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": false})))
        .mount(&server)
        .await;

    let result = client
        .set_time(TimeSet {
            hour: 1,
            minute: 2,
            day: 3,
        })
        .await;

    assert!(
        matches!(result, Err(Error::Rejected { .. })),
        "expected Rejected error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_plain_text_ack_counts_as_success() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/relay"))
        .and(body_json(json!({"state": true})))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(&server)
        .await;

    client.set_relay(true).await.unwrap();
}

#[tokio::test]
async fn test_get_reading() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "voltage": 229.4,
            "current": 3.2,
            "power": 712.0,
            "energy": 1.25,
            "frequency": 50.02,
            "pf": 0.97,
            "relay": true,
            "protectionTriggered": false
        })))
        .mount(&server)
        .await;

    let reading = client.get_reading().await.unwrap();

    assert!(reading.relay_state);
    assert!((reading.power_factor - 0.97).abs() < f64::EPSILON);
    assert_eq!(reading.protection_triggered, Some(false));
    assert!(reading.outage.is_none());
}

// ── Error tests ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_http_error_status() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("watchdog reset"))
        .mount(&server)
        .await;

    match client.get_settings().await {
        Err(Error::Http { status, ref message }) => {
            assert_eq!(status, 500);
            assert!(message.contains("watchdog"), "unexpected message: {message}");
        }
        other => panic!("expected Http error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_timeout_maps_to_timeout_error() {
    let server = MockServer::start().await;
    let client = DeviceClient::new(
        Url::parse(&server.uri()).unwrap(),
        &TransportConfig {
            timeout: Duration::from_millis(200),
            connect_timeout: None,
        },
    )
    .unwrap();

    Mock::given(method("GET"))
        .and(path("/api/settings"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let result = client.get_settings().await;

    assert!(
        matches!(result, Err(Error::Timeout { timeout_ms: 200 })),
        "expected Timeout error, got: {result:?}"
    );
}
