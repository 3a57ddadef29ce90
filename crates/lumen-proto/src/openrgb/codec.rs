// ── OpenRGB wire codec ──
//
// Every message is `[u32 device-index][u32 command-id][u32 payload-length]`
// followed by the payload, all little-endian. Requests and responses share
// the framing; a response echoes the command id of its request.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::color::Color;
use crate::error::Error;

/// Frame header size: device index + command id + payload length.
pub const HEADER_LEN: usize = 12;

// Command ids (OpenRGB SDK numbering).
pub const CMD_CONTROLLER_COUNT: u32 = 0;
pub const CMD_CONTROLLER_DATA: u32 = 1;
pub const CMD_UPDATE_LEDS: u32 = 1050;
pub const CMD_UPDATE_MODE: u32 = 1101;

/// A single framed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub device_index: u32,
    pub command: u32,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(device_index: u32, command: u32, payload: Bytes) -> Self {
        Self {
            device_index,
            command,
            payload,
        }
    }

    /// Serialize header + payload into one buffer.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.payload.len());
        buf.put_u32_le(self.device_index);
        buf.put_u32_le(self.command);
        buf.put_u32_le(u32::try_from(self.payload.len()).unwrap_or(u32::MAX));
        buf.extend_from_slice(&self.payload);
        buf.freeze()
    }
}

/// Parse a 12-byte header into (device index, command id, payload length).
pub fn decode_header(header: &[u8; HEADER_LEN]) -> (u32, u32, u32) {
    let mut buf = &header[..];
    let device_index = buf.get_u32_le();
    let command = buf.get_u32_le();
    let payload_len = buf.get_u32_le();
    (device_index, command, payload_len)
}

fn short_payload(what: &str) -> Error {
    Error::Protocol {
        message: format!("truncated payload while reading {what}"),
    }
}

fn get_string(buf: &mut Bytes, what: &str) -> Result<String, Error> {
    if buf.remaining() < 2 {
        return Err(short_payload(what));
    }
    let len = usize::from(buf.get_u16_le());
    if buf.remaining() < len {
        return Err(short_payload(what));
    }
    let raw = buf.split_to(len);
    String::from_utf8(raw.to_vec()).map_err(|_| Error::Protocol {
        message: format!("non-UTF-8 string in {what}"),
    })
}

/// Parsed "get controller data" response: name, identity, modes, zones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerData {
    pub name: String,
    pub vendor: String,
    pub serial: String,
    /// Mode names in backend index order.
    pub modes: Vec<String>,
    pub zones: Vec<ZoneData>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneData {
    pub name: String,
    pub led_count: u32,
}

impl ControllerData {
    pub fn total_leds(&self) -> usize {
        self.zones.iter().map(|z| z.led_count as usize).sum()
    }
}

/// Parse a "get controller count" response payload.
pub fn parse_controller_count(mut payload: Bytes) -> Result<u32, Error> {
    if payload.remaining() < 4 {
        return Err(short_payload("controller count"));
    }
    Ok(payload.get_u32_le())
}

/// Parse a "get controller data" response payload.
///
/// Layout: three length-prefixed strings (name, vendor, serial), a
/// length-prefixed list of mode names, then a length-prefixed list of
/// zones as (name, u32 led count).
pub fn parse_controller_data(mut payload: Bytes) -> Result<ControllerData, Error> {
    let name = get_string(&mut payload, "controller name")?;
    let vendor = get_string(&mut payload, "controller vendor")?;
    let serial = get_string(&mut payload, "controller serial")?;

    if payload.remaining() < 2 {
        return Err(short_payload("mode count"));
    }
    let mode_count = usize::from(payload.get_u16_le());
    let mut modes = Vec::with_capacity(mode_count);
    for _ in 0..mode_count {
        modes.push(get_string(&mut payload, "mode name")?);
    }

    if payload.remaining() < 2 {
        return Err(short_payload("zone count"));
    }
    let zone_count = usize::from(payload.get_u16_le());
    let mut zones = Vec::with_capacity(zone_count);
    for _ in 0..zone_count {
        let name = get_string(&mut payload, "zone name")?;
        if payload.remaining() < 4 {
            return Err(short_payload("zone led count"));
        }
        let led_count = payload.get_u32_le();
        zones.push(ZoneData { name, led_count });
    }

    Ok(ControllerData {
        name,
        vendor,
        serial,
        modes,
        zones,
    })
}

/// Encode an "update LEDs" payload: the full color array for the device.
///
/// `u16` LED count followed by 4 bytes per LED (r, g, b, pad). The backend
/// applies the whole array atomically; partial zone updates are synthesized
/// by the caller re-sending the array with one zone's range modified.
pub fn encode_update_leds(leds: &[Color]) -> Bytes {
    let mut buf = BytesMut::with_capacity(2 + leds.len() * 4);
    buf.put_u16_le(u16::try_from(leds.len()).unwrap_or(u16::MAX));
    for led in leds {
        buf.put_u8(led.r);
        buf.put_u8(led.g);
        buf.put_u8(led.b);
        buf.put_u8(0);
    }
    buf.freeze()
}

/// Encode an "update mode" payload: the backend mode index to activate.
pub fn encode_update_mode(mode_index: u32) -> Bytes {
    let mut buf = BytesMut::with_capacity(4);
    buf.put_u32_le(mode_index);
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_string(buf: &mut BytesMut, s: &str) {
        buf.put_u16_le(u16::try_from(s.len()).unwrap());
        buf.extend_from_slice(s.as_bytes());
    }

    #[test]
    fn frame_round_trip_header() {
        let frame = Frame::new(3, CMD_CONTROLLER_DATA, Bytes::from_static(b"abcd"));
        let encoded = frame.encode();
        assert_eq!(encoded.len(), HEADER_LEN + 4);

        let mut header = [0u8; HEADER_LEN];
        header.copy_from_slice(&encoded[..HEADER_LEN]);
        let (idx, cmd, len) = decode_header(&header);
        assert_eq!((idx, cmd, len), (3, CMD_CONTROLLER_DATA, 4));
        assert_eq!(&encoded[HEADER_LEN..], b"abcd");
    }

    #[test]
    fn controller_count_parses() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(7);
        assert_eq!(parse_controller_count(buf.freeze()).unwrap(), 7);
    }

    #[test]
    fn controller_count_rejects_short_payload() {
        let err = parse_controller_count(Bytes::from_static(&[1, 2])).unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[test]
    fn controller_data_parses_full_topology() {
        let mut buf = BytesMut::new();
        push_string(&mut buf, "Corsair K70");
        push_string(&mut buf, "Corsair");
        push_string(&mut buf, "SN1234");
        buf.put_u16_le(2);
        push_string(&mut buf, "Direct");
        push_string(&mut buf, "Rainbow Wave");
        buf.put_u16_le(2);
        push_string(&mut buf, "Keys");
        buf.put_u32_le(104);
        push_string(&mut buf, "Bar");
        buf.put_u32_le(19);

        let data = parse_controller_data(buf.freeze()).unwrap();
        assert_eq!(data.name, "Corsair K70");
        assert_eq!(data.serial, "SN1234");
        assert_eq!(data.modes, vec!["Direct", "Rainbow Wave"]);
        assert_eq!(data.zones.len(), 2);
        assert_eq!(data.zones[1].led_count, 19);
        assert_eq!(data.total_leds(), 123);
    }

    #[test]
    fn controller_data_rejects_truncation() {
        let mut buf = BytesMut::new();
        push_string(&mut buf, "X");
        push_string(&mut buf, "Y");
        // serial string cut off mid-length
        buf.put_u8(4);
        let err = parse_controller_data(buf.freeze()).unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[test]
    fn update_leds_payload_layout() {
        let payload = encode_update_leds(&[Color::new(1, 2, 3), Color::new(4, 5, 6)]);
        assert_eq!(&payload[..], &[2, 0, 1, 2, 3, 0, 4, 5, 6, 0]);
    }
}
