// Integration tests for `MonitorClient` using wiremock.

use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use srtwatch_api::client::ReportAction;
use srtwatch_api::{Error, MonitorClient};
use srtwatch_core::{StatusReport, StreamingState};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, MonitorClient) {
    let server = MockServer::start().await;
    let client = MonitorClient::from_reqwest(&server.uri(), reqwest::Client::new())
        .expect("mock server uri parses");
    (server, client)
}

fn sample_report() -> StatusReport {
    StatusReport {
        identity: Some("CAM1".to_string()),
        local_address: "192.168.1.10".to_string(),
        public_address: Some("203.0.113.5".to_string()),
        streaming_state: StreamingState::On,
        port: 9001,
        liveness: Some(true),
    }
}

fn wire_entry(identity: &str, port: u16) -> serde_json::Value {
    json!({
        "timestamp": "2026-08-29T10:00:00Z",
        "data": {
            "identity": identity,
            "local_address": "192.168.1.10",
            "public_address": "203.0.113.5",
            "streaming_state": "ON",
            "port": port,
            "liveness": true
        }
    })
}

// ── Happy-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_submit_report_inserted() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/report"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "action": "inserted"
            })),
        )
        .mount(&server)
        .await;

    let ack = client
        .submit_report(&sample_report())
        .await
        .expect("report accepted");

    assert_eq!(ack.status, "ok");
    assert_eq!(ack.action, ReportAction::Inserted);
}

#[tokio::test]
async fn test_submit_report_updated() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/report"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "action": "updated"
            })),
        )
        .mount(&server)
        .await;

    let ack = client
        .submit_report(&sample_report())
        .await
        .expect("report accepted");

    assert_eq!(ack.action, ReportAction::Updated);
}

#[tokio::test]
async fn test_fetch_snapshot() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([wire_entry("CAM2", 9002), wire_entry("CAM1", 9001)])),
        )
        .mount(&server)
        .await;

    let entries = client.fetch_snapshot().await.expect("snapshot fetched");

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].data.identity, "CAM2");
    assert_eq!(entries[1].data.identity, "CAM1");
    assert_eq!(entries[1].data.streaming_state, StreamingState::On);
}

#[tokio::test]
async fn test_fetch_by_address() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/devices"))
        .and(query_param("address", "192.168.1.10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([wire_entry("CAM1", 9001)])))
        .mount(&server)
        .await;

    let entries = client
        .fetch_by_address("192.168.1.10")
        .await
        .expect("filtered fetch succeeds");

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].data.local_address, "192.168.1.10");
}

#[tokio::test]
async fn test_remove_device() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/remove"))
        .and(body_json(json!({
            "identity": "CAM1",
            "local_address": "192.168.1.10",
            "port": 9001
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
        .mount(&server)
        .await;

    client
        .remove_device("CAM1", "192.168.1.10", 9001)
        .await
        .expect("removal accepted");
}

#[tokio::test]
async fn test_rename_device() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/update_name"))
        .and(body_json(json!({
            "old_name": "CAM1",
            "new_name": "STAGE-LEFT"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
        .mount(&server)
        .await;

    client
        .rename_device("CAM1", "STAGE-LEFT")
        .await
        .expect("rename accepted");
}

// ── Error handling ──────────────────────────────────────────────────

#[tokio::test]
async fn test_remove_unknown_device_is_not_found() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/remove"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "error": "device not found" })),
        )
        .mount(&server)
        .await;

    let err = client
        .remove_device("GHOST", "10.0.0.1", 1234)
        .await
        .expect_err("unknown device should fail");

    assert!(err.is_not_found());
    match err {
        Error::Api { message, status } => {
            assert_eq!(status, 404);
            assert_eq!(message, "device not found");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_report_rejected_with_validation_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/report"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "error": "port must be nonzero" })),
        )
        .mount(&server)
        .await;

    let err = client
        .submit_report(&sample_report())
        .await
        .expect_err("validation failure should surface");

    assert!(!err.is_transient());
    match err {
        Error::Api { message, status } => {
            assert_eq!(status, 400);
            assert_eq!(message, "port must be nonzero");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client
        .fetch_snapshot()
        .await
        .expect_err("503 should surface");

    assert!(err.is_transient());
}

#[tokio::test]
async fn test_malformed_snapshot_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client
        .fetch_snapshot()
        .await
        .expect_err("malformed body should fail");

    match err {
        Error::Deserialization { body, .. } => assert_eq!(body, "not json"),
        other => panic!("expected Deserialization error, got {other:?}"),
    }
}
