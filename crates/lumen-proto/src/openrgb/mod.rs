// ── OpenRGB protocol client ──
//
// Persistent binary TCP connection to an OpenRGB server. Enumeration is a
// controller-count request followed by one controller-data request per
// index. The backend only accepts whole-device LED arrays, so zone writes
// re-send the cached full array with the target zone's range rewritten.

pub mod codec;

use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::client::{ProtocolClient, ProtocolKind};
use crate::color::{Color, EffectDescriptor};
use crate::error::Error;
use crate::report::{CapabilitySet, DeviceObservation, ZoneObservation};
use codec::{
    CMD_CONTROLLER_COUNT, CMD_CONTROLLER_DATA, CMD_UPDATE_LEDS, CMD_UPDATE_MODE, Frame, HEADER_LEN,
};

/// Upper bound on a single response payload. Anything larger is a framing
/// error, not a real topology.
const MAX_PAYLOAD: u32 = 1 << 20;

/// Effects every OpenRGB-addressable device is assumed to support at the
/// capability level; the actual mode list still gates `set_effect`.
const BASE_EFFECTS: &[crate::color::EffectKind] = &[
    crate::color::EffectKind::Static,
    crate::color::EffectKind::Off,
];

#[derive(Debug, Clone)]
struct CachedDevice {
    index: u32,
    modes: Vec<String>,
    /// Zone LED ranges as (offset, length), indexed by zone id.
    zone_ranges: Vec<(usize, usize)>,
    /// Full LED array last sent to the backend.
    leds: Vec<Color>,
    /// Whether `leds` reflects a write of ours (colors are unknown before).
    written: bool,
}

struct Inner {
    conn: Option<TcpStream>,
    /// Keyed by device address (serial, or `{addr}/{index}` fallback).
    topology: HashMap<String, CachedDevice>,
}

/// Client for an OpenRGB server backend.
pub struct OpenRgbClient {
    name: String,
    addr: String,
    timeout: Duration,
    /// Single lock over connection and cache: commands to this backend are
    /// strictly serialized, so frames never interleave on the wire.
    inner: Mutex<Inner>,
}

impl OpenRgbClient {
    /// Default OpenRGB SDK server port.
    pub const DEFAULT_PORT: u16 = 6742;

    pub fn new(host: &str, port: u16, timeout: Duration) -> Self {
        let addr = format!("{host}:{port}");
        Self {
            name: format!("openrgb@{addr}"),
            addr,
            timeout,
            inner: Mutex::new(Inner {
                conn: None,
                topology: HashMap::new(),
            }),
        }
    }

    pub fn localhost() -> Self {
        Self::new("127.0.0.1", Self::DEFAULT_PORT, Duration::from_secs(5))
    }

    fn timeout_err(&self) -> Error {
        Error::Timeout {
            timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    async fn ensure_connected(&self, inner: &mut Inner) -> Result<(), Error> {
        if inner.conn.is_some() {
            return Ok(());
        }
        let stream = tokio::time::timeout(self.timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| self.timeout_err())?
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::ConnectionRefused {
                    Error::ConnectionRefused {
                        endpoint: self.addr.clone(),
                    }
                } else {
                    Error::Io(e)
                }
            })?;
        debug!(backend = %self.name, "connected");
        inner.conn = Some(stream);
        Ok(())
    }

    /// Send a frame and read the echoed response. Any failure drops the
    /// connection so the next call reconnects from a clean state.
    async fn request(
        &self,
        inner: &mut Inner,
        device_index: u32,
        command: u32,
        payload: Bytes,
    ) -> Result<Bytes, Error> {
        self.ensure_connected(inner).await?;
        let result = tokio::time::timeout(
            self.timeout,
            Self::exchange(inner, device_index, command, payload),
        )
        .await;
        match result {
            Ok(Ok(body)) => Ok(body),
            Ok(Err(e)) => {
                inner.conn = None;
                Err(e)
            }
            Err(_) => {
                inner.conn = None;
                Err(self.timeout_err())
            }
        }
    }

    async fn exchange(
        inner: &mut Inner,
        device_index: u32,
        command: u32,
        payload: Bytes,
    ) -> Result<Bytes, Error> {
        let stream = inner.conn.as_mut().ok_or_else(|| Error::Protocol {
            message: "request on closed connection".into(),
        })?;

        let frame = Frame::new(device_index, command, payload);
        stream.write_all(&frame.encode()).await?;
        stream.flush().await?;

        let mut header = [0u8; HEADER_LEN];
        stream.read_exact(&mut header).await?;
        let (_, resp_command, resp_len) = codec::decode_header(&header);
        if resp_command != command {
            return Err(Error::Protocol {
                message: format!("response command {resp_command} does not match request {command}"),
            });
        }
        if resp_len > MAX_PAYLOAD {
            return Err(Error::Protocol {
                message: format!("response payload of {resp_len} bytes exceeds limit"),
            });
        }
        let mut body = vec![0u8; resp_len as usize];
        stream.read_exact(&mut body).await?;
        Ok(Bytes::from(body))
    }

    /// Send a command that has no response (LED/mode updates).
    async fn send(
        &self,
        inner: &mut Inner,
        device_index: u32,
        command: u32,
        payload: Bytes,
    ) -> Result<(), Error> {
        self.ensure_connected(inner).await?;
        let frame = Frame::new(device_index, command, payload).encode();
        let io = async {
            let stream = inner.conn.as_mut().ok_or_else(|| Error::Protocol {
                message: "send on closed connection".into(),
            })?;
            stream.write_all(&frame).await?;
            stream.flush().await?;
            Ok::<(), Error>(())
        };
        match tokio::time::timeout(self.timeout, io).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                inner.conn = None;
                Err(e)
            }
            Err(_) => {
                inner.conn = None;
                Err(self.timeout_err())
            }
        }
    }

    fn observation(&self, address: &str, data: &codec::ControllerData, cached: &CachedDevice) -> DeviceObservation {
        let mut offset = 0usize;
        let zones = data
            .zones
            .iter()
            .enumerate()
            .map(|(zone_id, z)| {
                let color = if cached.written {
                    cached.leds.get(offset).copied()
                } else {
                    None
                };
                offset += z.led_count as usize;
                ZoneObservation {
                    zone_id: u32::try_from(zone_id).unwrap_or(u32::MAX),
                    name: Some(z.name.clone()),
                    led_count: z.led_count,
                    color,
                }
            })
            .collect();

        let mut effects: Vec<_> = BASE_EFFECTS.to_vec();
        for kind in [
            crate::color::EffectKind::Breathing,
            crate::color::EffectKind::Wave,
            crate::color::EffectKind::Rainbow,
            crate::color::EffectKind::SpectrumCycle,
            crate::color::EffectKind::Reactive,
        ] {
            if mode_index_for(&data.modes, kind).is_some() {
                effects.push(kind);
            }
        }

        DeviceObservation {
            vendor: data.vendor.clone(),
            serial_or_path: address.to_string(),
            name: data.name.clone(),
            protocol: ProtocolKind::OpenRgb,
            zones,
            capabilities: CapabilitySet {
                effects,
                color_depth_bits: 8,
                zone_control: true,
            },
            identity_hint: None,
        }
    }
}

/// Match an effect against the backend's free-form mode names.
fn mode_index_for(modes: &[String], kind: crate::color::EffectKind) -> Option<u32> {
    for alias in kind.aliases() {
        if let Some(i) = modes
            .iter()
            .position(|m| m.to_lowercase().contains(alias))
        {
            return u32::try_from(i).ok();
        }
    }
    None
}

#[async_trait::async_trait]
impl ProtocolClient for OpenRgbClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProtocolKind {
        ProtocolKind::OpenRgb
    }

    async fn connect(&self) -> Result<(), Error> {
        let mut inner = self.inner.lock().await;
        self.ensure_connected(&mut inner).await
    }

    async fn disconnect(&self) {
        let mut inner = self.inner.lock().await;
        if inner.conn.take().is_some() {
            debug!(backend = %self.name, "disconnected");
        }
    }

    async fn list_devices(&self) -> Result<Vec<DeviceObservation>, Error> {
        let mut inner = self.inner.lock().await;

        let count_body = self
            .request(&mut inner, 0, CMD_CONTROLLER_COUNT, Bytes::new())
            .await?;
        let count = codec::parse_controller_count(count_body)?;
        debug!(backend = %self.name, controllers = count, "enumerating");

        let mut observations = Vec::with_capacity(count as usize);
        let mut topology = HashMap::with_capacity(count as usize);
        for index in 0..count {
            let body = self
                .request(&mut inner, index, CMD_CONTROLLER_DATA, Bytes::new())
                .await?;
            let data = codec::parse_controller_data(body)?;

            let address = if data.serial.is_empty() {
                format!("{}/{index}", self.addr)
            } else {
                data.serial.clone()
            };

            let mut zone_ranges = Vec::with_capacity(data.zones.len());
            let mut offset = 0usize;
            for z in &data.zones {
                zone_ranges.push((offset, z.led_count as usize));
                offset += z.led_count as usize;
            }

            // Keep the LED cache across rescans when the topology is stable,
            // so zone writes after a rescan still see prior colors.
            let cached = match inner.topology.get(&address) {
                Some(prev) if prev.leds.len() == data.total_leds() => CachedDevice {
                    index,
                    modes: data.modes.clone(),
                    zone_ranges,
                    leds: prev.leds.clone(),
                    written: prev.written,
                },
                _ => CachedDevice {
                    index,
                    modes: data.modes.clone(),
                    zone_ranges,
                    leds: vec![Color::BLACK; data.total_leds()],
                    written: false,
                },
            };

            observations.push(self.observation(&address, &data, &cached));
            topology.insert(address, cached);
        }

        inner.topology = topology;
        Ok(observations)
    }

    async fn set_zone_color(&self, device: &str, zone_id: u32, color: Color) -> Result<(), Error> {
        let mut inner = self.inner.lock().await;

        let (index, payload) = {
            let cached = inner.topology.get_mut(device).ok_or_else(|| Error::DeviceNotFound {
                device: device.to_string(),
            })?;
            let &(start, len) =
                cached
                    .zone_ranges
                    .get(zone_id as usize)
                    .ok_or_else(|| Error::DeviceNotFound {
                        device: format!("{device} zone {zone_id}"),
                    })?;
            for led in &mut cached.leds[start..start + len] {
                *led = color;
            }
            cached.written = true;
            (cached.index, codec::encode_update_leds(&cached.leds))
        };

        self.send(&mut inner, index, CMD_UPDATE_LEDS, payload).await
    }

    async fn set_effect(&self, device: &str, effect: EffectDescriptor) -> Result<(), Error> {
        let mut inner = self.inner.lock().await;

        let (index, mode, fill) = {
            let cached = inner.topology.get_mut(device).ok_or_else(|| Error::DeviceNotFound {
                device: device.to_string(),
            })?;
            let mode = mode_index_for(&cached.modes, effect.kind).ok_or_else(|| {
                Error::UnsupportedOperation {
                    operation: format!("effect {} on {device}", effect.kind),
                }
            })?;
            let fill = effect.color.map(|color| {
                for led in &mut cached.leds {
                    *led = color;
                }
                cached.written = true;
                (cached.index, codec::encode_update_leds(&cached.leds))
            });
            (cached.index, mode, fill)
        };

        self.send(&mut inner, index, CMD_UPDATE_MODE, codec::encode_update_mode(mode))
            .await?;
        if let Some((fill_index, payload)) = fill {
            self.send(&mut inner, fill_index, CMD_UPDATE_LEDS, payload)
                .await?;
        }
        Ok(())
    }

    async fn heartbeat(&self) -> Result<(), Error> {
        let mut inner = self.inner.lock().await;
        match self
            .request(&mut inner, 0, CMD_CONTROLLER_COUNT, Bytes::new())
            .await
        {
            Ok(body) => {
                codec::parse_controller_count(body)?;
                Ok(())
            }
            Err(e) => {
                warn!(backend = %self.name, error = %e, "heartbeat failed");
                Err(e)
            }
        }
    }
}
