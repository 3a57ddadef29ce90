#![allow(clippy::unwrap_used)]
// Integration tests for `OpenRgbClient` against an in-process TCP stub.

use std::sync::Arc;
use std::time::Duration;

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use lumen_proto::openrgb::codec::{
    self, CMD_CONTROLLER_COUNT, CMD_CONTROLLER_DATA, CMD_UPDATE_LEDS, CMD_UPDATE_MODE, HEADER_LEN,
};
use lumen_proto::{Color, EffectDescriptor, EffectKind, Error, OpenRgbClient, ProtocolClient};

// ── Stub backend ────────────────────────────────────────────────────

/// One recorded inbound frame: (device index, command, payload).
type RecordedFrame = (u32, u32, Vec<u8>);

struct StubController {
    name: &'static str,
    vendor: &'static str,
    serial: &'static str,
    modes: &'static [&'static str],
    /// (zone name, led count)
    zones: &'static [(&'static str, u32)],
}

fn push_string(buf: &mut BytesMut, s: &str) {
    buf.put_u16_le(u16::try_from(s.len()).unwrap());
    buf.extend_from_slice(s.as_bytes());
}

fn controller_payload(c: &StubController) -> Vec<u8> {
    let mut buf = BytesMut::new();
    push_string(&mut buf, c.name);
    push_string(&mut buf, c.vendor);
    push_string(&mut buf, c.serial);
    buf.put_u16_le(u16::try_from(c.modes.len()).unwrap());
    for mode in c.modes {
        push_string(&mut buf, mode);
    }
    buf.put_u16_le(u16::try_from(c.zones.len()).unwrap());
    for (name, led_count) in c.zones {
        push_string(&mut buf, name);
        buf.put_u32_le(*led_count);
    }
    buf.to_vec()
}

/// Spawn a single-connection stub server. Update commands are recorded and
/// get no reply; enumeration commands are answered from the controller set.
async fn spawn_stub(
    controllers: Vec<StubController>,
) -> (u16, Arc<Mutex<Vec<RecordedFrame>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let recorded = Arc::new(Mutex::new(Vec::new()));
    let recorded_task = Arc::clone(&recorded);

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        loop {
            let mut header = [0u8; HEADER_LEN];
            if stream.read_exact(&mut header).await.is_err() {
                break;
            }
            let (device_index, command, payload_len) = codec::decode_header(&header);
            let mut payload = vec![0u8; payload_len as usize];
            if stream.read_exact(&mut payload).await.is_err() {
                break;
            }

            match command {
                CMD_CONTROLLER_COUNT => {
                    let mut body = BytesMut::new();
                    body.put_u32_le(u32::try_from(controllers.len()).unwrap());
                    reply(&mut stream, device_index, command, &body).await;
                }
                CMD_CONTROLLER_DATA => {
                    let body = controller_payload(&controllers[device_index as usize]);
                    reply(&mut stream, device_index, command, &body).await;
                }
                CMD_UPDATE_LEDS | CMD_UPDATE_MODE => {
                    recorded_task
                        .lock()
                        .await
                        .push((device_index, command, payload));
                }
                other => panic!("stub received unknown command {other}"),
            }
        }
    });

    (port, recorded)
}

async fn reply(stream: &mut tokio::net::TcpStream, device_index: u32, command: u32, body: &[u8]) {
    let mut buf = BytesMut::new();
    buf.put_u32_le(device_index);
    buf.put_u32_le(command);
    buf.put_u32_le(u32::try_from(body.len()).unwrap());
    buf.extend_from_slice(body);
    stream.write_all(&buf).await.unwrap();
}

fn keyboard() -> StubController {
    StubController {
        name: "Evofox Fireblade",
        vendor: "Evofox",
        serial: "KB-0042",
        modes: &["Direct", "Breathing", "Rainbow Wave"],
        zones: &[("keys", 4), ("strip", 2)],
    }
}

fn mainboard() -> StubController {
    StubController {
        name: "B650 Steel Legend",
        vendor: "ASRock",
        serial: "",
        modes: &["Direct"],
        zones: &[("header", 3)],
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn enumeration_reports_zone_topology() {
    let (port, _) = spawn_stub(vec![keyboard(), mainboard()]).await;
    let client = OpenRgbClient::new("127.0.0.1", port, Duration::from_secs(2));

    let devices = client.list_devices().await.unwrap();

    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].serial_or_path, "KB-0042");
    assert_eq!(devices[0].zones.len(), 2);
    assert_eq!(devices[0].zones[1].led_count, 2);
    assert!(devices[0].capabilities.supports(EffectKind::Breathing));
    assert!(devices[0].capabilities.zone_control);
    // Colors are unknown before the first write.
    assert!(devices[0].zones.iter().all(|z| z.color.is_none()));
    // Serial-less controllers fall back to an address path.
    assert_eq!(devices[1].serial_or_path, format!("127.0.0.1:{port}/1"));
}

#[tokio::test]
async fn zone_write_resends_full_array_with_zone_modified() {
    let (port, recorded) = spawn_stub(vec![keyboard()]).await;
    let client = OpenRgbClient::new("127.0.0.1", port, Duration::from_secs(2));
    client.list_devices().await.unwrap();

    let red = Color::new(255, 0, 0);
    let blue = Color::new(0, 0, 255);
    client.set_zone_color("KB-0042", 1, red).await.unwrap();
    client.set_zone_color("KB-0042", 0, blue).await.unwrap();

    // Updates are fire-and-forget; give the stub a beat to record them.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let frames = recorded.lock().await;
    assert_eq!(frames.len(), 2);

    // First write: zone 0 (4 LEDs) untouched black, zone 1 (2 LEDs) red.
    let (idx, cmd, payload) = &frames[0];
    assert_eq!((*idx, *cmd), (0, CMD_UPDATE_LEDS));
    assert_eq!(payload[..2], [6, 0]); // u16 LED count
    assert_eq!(payload[2..6], [0, 0, 0, 0]); // first LED still black
    assert_eq!(payload[2 + 4 * 4..2 + 4 * 4 + 4], [255, 0, 0, 0]); // zone 1 red

    // Second write: zone 0 blue, zone 1 retains red from the cache.
    let (_, _, payload) = &frames[1];
    assert_eq!(payload[2..6], [0, 0, 255, 0]);
    assert_eq!(payload[2 + 4 * 4..2 + 4 * 4 + 4], [255, 0, 0, 0]);
}

#[tokio::test]
async fn effect_selects_backend_mode_by_alias() {
    let (port, recorded) = spawn_stub(vec![keyboard()]).await;
    let client = OpenRgbClient::new("127.0.0.1", port, Duration::from_secs(2));
    client.list_devices().await.unwrap();

    client
        .set_effect(
            "KB-0042",
            EffectDescriptor {
                kind: EffectKind::Wave,
                color: None,
                speed: None,
            },
        )
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    let frames = recorded.lock().await;
    assert_eq!(frames.len(), 1);
    let (_, cmd, payload) = &frames[0];
    assert_eq!(*cmd, CMD_UPDATE_MODE);
    assert_eq!(payload[..4], [2, 0, 0, 0]); // "Rainbow Wave" is mode 2
}

#[tokio::test]
async fn unsupported_effect_is_rejected_client_side() {
    let (port, _) = spawn_stub(vec![mainboard()]).await;
    let client = OpenRgbClient::new("127.0.0.1", port, Duration::from_secs(2));
    let devices = client.list_devices().await.unwrap();
    let address = devices[0].serial_or_path.clone();

    let result = client
        .set_effect(
            &address,
            EffectDescriptor {
                kind: EffectKind::Reactive,
                color: None,
                speed: None,
            },
        )
        .await;
    assert!(
        matches!(result, Err(Error::UnsupportedOperation { .. })),
        "expected UnsupportedOperation, got: {result:?}"
    );
}

#[tokio::test]
async fn unknown_device_address_is_not_found() {
    let (port, _) = spawn_stub(vec![keyboard()]).await;
    let client = OpenRgbClient::new("127.0.0.1", port, Duration::from_secs(2));
    client.list_devices().await.unwrap();

    let result = client
        .set_zone_color("no-such-serial", 0, Color::BLACK)
        .await;
    assert!(matches!(result, Err(Error::DeviceNotFound { .. })));
}

#[tokio::test]
async fn connect_refused_without_backend() {
    let client = OpenRgbClient::new("127.0.0.1", 1, Duration::from_secs(2));
    let result = client.connect().await;
    assert!(
        matches!(result, Err(Error::ConnectionRefused { .. })),
        "expected ConnectionRefused, got: {result:?}"
    );
}

#[tokio::test]
async fn heartbeat_probes_controller_count() {
    let (port, _) = spawn_stub(vec![keyboard()]).await;
    let client = OpenRgbClient::new("127.0.0.1", port, Duration::from_secs(2));
    client.heartbeat().await.unwrap();
}
