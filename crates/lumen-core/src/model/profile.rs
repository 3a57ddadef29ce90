// ── Profile types ──
//
// A profile is a named, ordered mapping from (device, zone) to a target
// color or effect. Referencing a device absent from the registry is valid;
// such entries are reported Skipped at apply time.

use serde::{Deserialize, Serialize};

use lumen_proto::{Color, EffectDescriptor};

use super::device::{ConnectionStatus, Device, DeviceId};

/// Which part of a device an entry addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneSelector {
    /// A single zone by id.
    Zone(u32),
    /// The whole device.
    Device,
}

/// What to apply to the selected target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Color(Color),
    Effect(EffectDescriptor),
}

/// One profile line: device, zone selector, target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileEntry {
    pub device: DeviceId,
    pub zone: ZoneSelector,
    pub target: Target,
}

/// A user-authored lighting profile.
///
/// Entry order is meaningful: commands for one device are issued in the
/// order its entries appear here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub entries: Vec<ProfileEntry>,
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    pub fn with_entry(mut self, device: DeviceId, zone: ZoneSelector, target: Target) -> Self {
        self.entries.push(ProfileEntry {
            device,
            zone,
            target,
        });
        self
    }

    pub fn set_zone(self, device: DeviceId, zone_id: u32, color: Color) -> Self {
        self.with_entry(device, ZoneSelector::Zone(zone_id), Target::Color(color))
    }

    pub fn set_device_effect(self, device: DeviceId, effect: EffectDescriptor) -> Self {
        self.with_entry(device, ZoneSelector::Device, Target::Effect(effect))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Group entries by device, preserving both first-appearance device
    /// order and per-device entry order.
    pub fn partition(&self) -> Vec<(DeviceId, Vec<ProfileEntry>)> {
        let mut groups: Vec<(DeviceId, Vec<ProfileEntry>)> = Vec::new();
        for entry in &self.entries {
            match groups.iter_mut().find(|(id, _)| *id == entry.device) {
                Some((_, entries)) => entries.push(entry.clone()),
                None => groups.push((entry.device, vec![entry.clone()])),
            }
        }
        groups
    }

    /// The subset of this profile addressing one device.
    pub fn restricted_to(&self, device: DeviceId) -> Self {
        Self {
            name: self.name.clone(),
            entries: self
                .entries
                .iter()
                .filter(|e| e.device == device)
                .cloned()
                .collect(),
        }
    }

    /// Synthetic profile turning every controllable online device off.
    pub fn all_off(snapshot: &[std::sync::Arc<Device>]) -> Self {
        let mut profile = Self::new("off");
        for device in snapshot {
            if device.status == ConnectionStatus::Online && device.is_controllable() {
                profile = profile.set_device_effect(device.id, EffectDescriptor::off());
            }
        }
        profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_proto::ProtocolKind;

    fn id(n: u8) -> DeviceId {
        DeviceId::from_parts("t", ProtocolKind::OpenRgb, &n.to_string())
    }

    #[test]
    fn partition_preserves_order() {
        let red = Color::new(255, 0, 0);
        let blue = Color::new(0, 0, 255);
        let profile = Profile::new("p")
            .set_zone(id(1), 0, red)
            .set_zone(id(2), 0, blue)
            .set_zone(id(1), 1, blue);

        let groups = profile.partition();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, id(1));
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[0].1[0].zone, ZoneSelector::Zone(0));
        assert_eq!(groups[0].1[1].zone, ZoneSelector::Zone(1));
        assert_eq!(groups[1].0, id(2));
    }

    #[test]
    fn restricted_to_keeps_only_one_device() {
        let c = Color::BLACK;
        let profile = Profile::new("p").set_zone(id(1), 0, c).set_zone(id(2), 0, c);
        let restricted = profile.restricted_to(id(2));
        assert_eq!(restricted.entries.len(), 1);
        assert_eq!(restricted.entries[0].device, id(2));
    }
}
