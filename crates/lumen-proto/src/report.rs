// ── Discovery observation types ──
//
// Raw topology as reported by a single backend during one discovery pass.
// These are observations, not registry records: the core converts and
// merges them; clients never mutate registry state.

use serde::{Deserialize, Serialize};

use crate::color::{Color, EffectKind};
use crate::client::ProtocolKind;

/// What a device can do, as reported by its backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    /// Effects the backend can drive on this device.
    pub effects: Vec<EffectKind>,
    /// Bits per color channel (8 for everything currently supported).
    pub color_depth_bits: u8,
    /// Whether individual zones can be addressed. Detection-only backends
    /// report `false` and an empty effect list.
    pub zone_control: bool,
}

impl CapabilitySet {
    /// A device that was detected but cannot be controlled.
    pub fn detection_only() -> Self {
        Self {
            effects: Vec::new(),
            color_depth_bits: 8,
            zone_control: false,
        }
    }

    pub fn supports(&self, effect: EffectKind) -> bool {
        self.effects.contains(&effect)
    }

    pub fn is_controllable(&self) -> bool {
        self.zone_control || !self.effects.is_empty()
    }
}

/// One addressable LED group as seen by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneObservation {
    /// Zone id, unique within the device.
    pub zone_id: u32,
    pub name: Option<String>,
    pub led_count: u32,
    /// Current color, if the backend reports one. `None` before first read.
    pub color: Option<Color>,
}

/// One device as seen by the backend during a single `list_devices` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceObservation {
    /// Vendor string (e.g. "Razer", "ASRock").
    pub vendor: String,
    /// Stable per-backend locator: serial number, device path, or index path.
    pub serial_or_path: String,
    /// Human-readable name for display.
    pub name: String,
    pub protocol: ProtocolKind,
    pub zones: Vec<ZoneObservation>,
    pub capabilities: CapabilitySet,
    /// Cross-backend identity hint (e.g. a DMI product string). When two
    /// backends report the same hint they are describing the same physical
    /// device and must collapse to one registry record.
    pub identity_hint: Option<String>,
}

impl DeviceObservation {
    /// The backend-local address used in control commands.
    pub fn address(&self) -> &str {
        &self.serial_or_path
    }
}
