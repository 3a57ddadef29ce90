#![allow(clippy::unwrap_used)]
// Integration tests for `ChromaClient` using wiremock.

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lumen_proto::{
    ChromaClient, ChromaConfig, Color, EffectDescriptor, EffectKind, Error, ProtocolClient,
    TransportConfig,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn config_for(server: &MockServer) -> ChromaConfig {
    ChromaConfig {
        endpoint: format!("{}/razer/chromasdk", server.uri()),
        ..ChromaConfig::default()
    }
}

async fn setup() -> (MockServer, ChromaClient) {
    let server = MockServer::start().await;
    let client = ChromaClient::new(config_for(&server), &TransportConfig::default()).unwrap();
    (server, client)
}

async fn mount_init(server: &MockServer, session_id: u64) {
    let body = json!({
        "sessionid": session_id,
        "uri": format!("{}/sid={session_id}", server.uri()),
    });
    Mock::given(method("POST"))
        .and(path("/razer/chromasdk"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

// ── Session lifecycle ───────────────────────────────────────────────

#[tokio::test]
async fn test_connect_establishes_session() {
    let (server, client) = setup().await;
    mount_init(&server, 41).await;

    client.connect().await.unwrap();
}

#[tokio::test]
async fn test_connect_refused_when_backend_absent() {
    // Nothing listens on port 1.
    let config = ChromaConfig {
        endpoint: "http://127.0.0.1:1/razer/chromasdk".to_string(),
        ..ChromaConfig::default()
    };
    let client = ChromaClient::new(config, &TransportConfig::default()).unwrap();

    let result = client.connect().await;
    assert!(
        matches!(result, Err(Error::ConnectionRefused { .. })),
        "expected ConnectionRefused, got: {result:?}"
    );
}

#[tokio::test]
async fn test_disconnect_releases_session() {
    let (server, client) = setup().await;
    mount_init(&server, 7).await;

    Mock::given(method("DELETE"))
        .and(path("/sid=7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": 0 })))
        .expect(1)
        .mount(&server)
        .await;

    client.connect().await.unwrap();
    client.disconnect().await;
}

// ── Enumeration ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_devices_reports_configured_topology() {
    let (server, client) = setup().await;
    mount_init(&server, 12).await;

    let devices = client.list_devices().await.unwrap();

    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].serial_or_path, "mouse");
    assert_eq!(devices[0].vendor, "Razer");
    assert_eq!(devices[0].zones.len(), 4);
    // Whole-device effects only, no per-zone control.
    assert!(!devices[0].capabilities.zone_control);
    assert!(devices[0].capabilities.supports(EffectKind::Static));
}

#[tokio::test]
async fn test_list_devices_fails_without_backend() {
    let config = ChromaConfig {
        endpoint: "http://127.0.0.1:1/razer/chromasdk".to_string(),
        ..ChromaConfig::default()
    };
    let client = ChromaClient::new(config, &TransportConfig::default()).unwrap();

    assert!(client.list_devices().await.is_err());
}

// ── Effects ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_set_effect_static_packs_color() {
    let (server, client) = setup().await;
    mount_init(&server, 3).await;

    Mock::given(method("PUT"))
        .and(path("/sid=3/mouse"))
        .and(body_partial_json(json!({
            "effect": "CHROMA_STATIC",
            "param": { "color": 0x00ff_0010 },
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": 0 })))
        .expect(1)
        .mount(&server)
        .await;

    client
        .set_effect("mouse", EffectDescriptor::static_color(Color::new(255, 0, 16)))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_set_effect_unknown_device_class() {
    let (server, client) = setup().await;
    mount_init(&server, 3).await;

    let result = client
        .set_effect("toaster", EffectDescriptor::off())
        .await;
    assert!(
        matches!(result, Err(Error::DeviceNotFound { .. })),
        "expected DeviceNotFound, got: {result:?}"
    );
}

#[tokio::test]
async fn test_set_effect_nonzero_result_is_protocol_error() {
    let (server, client) = setup().await;
    mount_init(&server, 9).await;

    Mock::given(method("PUT"))
        .and(path("/sid=9/mouse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": 1168 })))
        .mount(&server)
        .await;

    let result = client.set_effect("mouse", EffectDescriptor::off()).await;
    assert!(
        matches!(result, Err(Error::Protocol { .. })),
        "expected Protocol error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_zone_color_is_unsupported() {
    let (server, client) = setup().await;
    mount_init(&server, 3).await;

    let result = client
        .set_zone_color("mouse", 0, Color::new(1, 2, 3))
        .await;
    assert!(
        matches!(result, Err(Error::UnsupportedOperation { .. })),
        "expected UnsupportedOperation, got: {result:?}"
    );
}

// ── Heartbeat / expiry ──────────────────────────────────────────────

#[tokio::test]
async fn test_heartbeat_keeps_session_alive() {
    let (server, client) = setup().await;
    mount_init(&server, 5).await;

    Mock::given(method("PUT"))
        .and(path("/sid=5/heartbeat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "tick": 1 })))
        .expect(1)
        .mount(&server)
        .await;

    client.heartbeat().await.unwrap();
}

#[tokio::test]
async fn test_revoked_session_forces_reconnect() {
    let (server, client) = setup().await;
    mount_init(&server, 5).await;

    // The service answers 404 on the URI of a revoked session.
    Mock::given(method("PUT"))
        .and(path("/sid=5/heartbeat"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    client.connect().await.unwrap();
    let result = client.heartbeat().await;
    assert!(
        matches!(result, Err(Error::SessionExpired)),
        "expected SessionExpired, got: {result:?}"
    );

    // The next command re-registers (a second POST hits the init mock)
    // and succeeds against the fresh session URI.
    Mock::given(method("PUT"))
        .and(path("/sid=5/mouse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": 0 })))
        .expect(1)
        .mount(&server)
        .await;

    client.set_effect("mouse", EffectDescriptor::off()).await.unwrap();
}
