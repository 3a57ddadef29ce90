// ── Device domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use lumen_proto::{CapabilitySet, Color, DeviceObservation, ProtocolKind};

/// Canonical device identity: a stable 64-bit digest used as the
/// registry's deduplication key across discovery cycles and backends.
///
/// Hashed from `(vendor, protocol, serial-or-path)`, or from the backend's
/// explicit cross-protocol identity hint when one is present -- two
/// backends reporting the same hint converge on the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(u64);

impl DeviceId {
    pub fn from_parts(vendor: &str, protocol: ProtocolKind, serial_or_path: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(vendor.as_bytes());
        hasher.update([0x1f]);
        hasher.update(protocol.to_string().as_bytes());
        hasher.update([0x1f]);
        hasher.update(serial_or_path.as_bytes());
        Self::truncate(&hasher.finalize())
    }

    pub fn from_hint(hint: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"hint");
        hasher.update([0x1f]);
        hasher.update(hint.as_bytes());
        Self::truncate(&hasher.finalize())
    }

    pub fn of(observation: &DeviceObservation) -> Self {
        match &observation.identity_hint {
            Some(hint) => Self::from_hint(hint),
            None => Self::from_parts(
                &observation.vendor,
                observation.protocol,
                &observation.serial_or_path,
            ),
        }
    }

    fn truncate(digest: &[u8]) -> Self {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        Self(u64::from_be_bytes(bytes))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl std::str::FromStr for DeviceId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u64::from_str_radix(s, 16).map(Self)
    }
}

/// Live connection status of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Online,
    Offline,
    /// The device's backend errored or timed out during the last cycle;
    /// the device may still be present.
    Degraded,
}

impl ConnectionStatus {
    pub fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }
}

/// An independently addressable LED group on a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// Unique within the owning device.
    pub id: u32,
    pub name: Option<String>,
    pub led_count: u32,
    /// Last known color. `None` until first read or write.
    pub color: Option<Color>,
}

/// The canonical device record. Owned exclusively by the registry;
/// protocol clients only report observations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    pub vendor: String,
    pub protocol: ProtocolKind,
    /// Name of the client that reported this device; routes control
    /// commands back to the right backend.
    pub backend: String,
    /// Backend-local control address (serial or path).
    pub address: String,
    pub zones: Vec<Zone>,
    pub capabilities: CapabilitySet,
    pub status: ConnectionStatus,
    pub last_seen: Option<DateTime<Utc>>,
    /// Consecutive discovery cycles without an observation. Reset on sight;
    /// drives the Offline transition.
    #[serde(skip)]
    pub(crate) misses: u32,
}

impl Device {
    /// Build a fresh registry record from a backend observation.
    pub(crate) fn from_observation(backend: &str, obs: &DeviceObservation) -> Self {
        Self {
            id: DeviceId::of(obs),
            name: obs.name.clone(),
            vendor: obs.vendor.clone(),
            protocol: obs.protocol,
            backend: backend.to_string(),
            address: obs.serial_or_path.clone(),
            zones: obs
                .zones
                .iter()
                .map(|z| Zone {
                    id: z.zone_id,
                    name: z.name.clone(),
                    led_count: z.led_count,
                    color: z.color,
                })
                .collect(),
            capabilities: obs.capabilities.clone(),
            status: ConnectionStatus::Online,
            last_seen: Some(Utc::now()),
            misses: 0,
        }
    }

    pub fn zone(&self, zone_id: u32) -> Option<&Zone> {
        self.zones.iter().find(|z| z.id == zone_id)
    }

    pub fn is_controllable(&self) -> bool {
        self.capabilities.is_controllable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_stable_across_calls() {
        let a = DeviceId::from_parts("Razer", ProtocolKind::Chroma, "mouse");
        let b = DeviceId::from_parts("Razer", ProtocolKind::Chroma, "mouse");
        assert_eq!(a, b);
    }

    #[test]
    fn identity_differs_by_component() {
        let base = DeviceId::from_parts("Razer", ProtocolKind::Chroma, "mouse");
        assert_ne!(
            base,
            DeviceId::from_parts("Razer", ProtocolKind::Chroma, "keyboard")
        );
        assert_ne!(
            base,
            DeviceId::from_parts("Razer", ProtocolKind::OpenRgb, "mouse")
        );
    }

    #[test]
    fn shared_hint_converges_across_backends() {
        let via_openrgb = DeviceId::of(&lumen_proto::DeviceObservation {
            vendor: "ASRock".into(),
            serial_or_path: "sn-1".into(),
            name: "B650".into(),
            protocol: ProtocolKind::OpenRgb,
            zones: vec![],
            capabilities: CapabilitySet::detection_only(),
            identity_hint: Some("dmi/asrock-b650".into()),
        });
        let via_proxy = DeviceId::from_hint("dmi/asrock-b650");
        assert_eq!(via_openrgb, via_proxy);
    }

    #[test]
    fn display_round_trips() {
        let id = DeviceId::from_parts("x", ProtocolKind::OpenRgb, "y");
        let parsed: DeviceId = id.to_string().parse().expect("hex parse");
        assert_eq!(id, parsed);
    }
}
