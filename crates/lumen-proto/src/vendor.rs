// ── Vendor-proxy detection client ──
//
// Some hardware is only reachable through a vendor control suite (ASRock
// Polychrome, ASUS Aura, Lian Li L-Connect, MSI Mystic Light). These
// backends are modeled as capability-limited clients: a read-only presence
// probe on the vendor software's install paths, devices reported as
// "detected but not controllable", every control command rejected.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use crate::client::{ProtocolClient, ProtocolKind};
use crate::color::{Color, EffectDescriptor};
use crate::error::Error;
use crate::report::{CapabilitySet, DeviceObservation, ZoneObservation};

/// A device a vendor suite is known to manage, reported when the suite's
/// presence probe succeeds.
#[derive(Debug, Clone)]
pub struct ProxiedDevice {
    pub name: String,
    /// Stable locator within this vendor's namespace.
    pub key: String,
    /// Zone names with LED counts, informational only.
    pub zones: Vec<(String, u32)>,
    /// Cross-backend identity hint (e.g. DMI product string) so a
    /// controllable backend seeing the same hardware collapses to one
    /// registry record.
    pub identity_hint: Option<String>,
}

/// Detection-only client for one vendor control suite.
pub struct VendorProxyClient {
    name: String,
    vendor: String,
    /// Candidate install locations of the vendor software.
    probe_paths: Vec<PathBuf>,
    devices: Vec<ProxiedDevice>,
    detected: AtomicBool,
}

impl VendorProxyClient {
    pub fn new(vendor: &str, probe_paths: Vec<PathBuf>, devices: Vec<ProxiedDevice>) -> Self {
        Self {
            name: format!("vendor-proxy@{}", vendor.to_lowercase()),
            vendor: vendor.to_string(),
            probe_paths,
            devices,
            detected: AtomicBool::new(false),
        }
    }

    /// ASRock Polychrome probe with its stock install locations.
    pub fn asrock_polychrome(devices: Vec<ProxiedDevice>) -> Self {
        Self::new(
            "ASRock",
            [
                r"C:\Program Files (x86)\ASRock\Polychrome RGB\Polychrome RGB.exe",
                r"C:\Program Files\ASRock\Polychrome RGB\Polychrome RGB.exe",
                r"C:\Program Files (x86)\ASRock\ASRock Polychrome Sync\ASRock Polychrome Sync.exe",
                r"C:\Program Files\ASRock\ASRock Polychrome Sync\ASRock Polychrome Sync.exe",
            ]
            .iter()
            .map(PathBuf::from)
            .collect(),
            devices,
        )
    }

    /// Lian Li L-Connect probe.
    pub fn lian_li_lconnect(devices: Vec<ProxiedDevice>) -> Self {
        Self::new(
            "Lian Li",
            [
                r"C:\Program Files (x86)\LIAN LI\L-Connect 3\L-Connect 3.exe",
                r"C:\Program Files\LIAN LI\L-Connect 3\L-Connect 3.exe",
            ]
            .iter()
            .map(PathBuf::from)
            .collect(),
            devices,
        )
    }

    /// G.Skill RGB RAM probe. The RAM is driven through ASUS Aura Sync or
    /// G.Skill's own Trident Z tool, so both install sets are checked.
    pub fn gskill_aura(devices: Vec<ProxiedDevice>) -> Self {
        Self::new(
            "G.Skill",
            [
                r"C:\Program Files (x86)\ASUS\AURA\AuraSyncSvcWrap.exe",
                r"C:\Program Files\ASUS\AURA\AuraSyncSvcWrap.exe",
                r"C:\Program Files (x86)\G.SKILL\G.SKILL Trident Z Lighting Control\G.SKILL Trident Z Lighting Control.exe",
                r"C:\Program Files\G.SKILL\G.SKILL Trident Z Lighting Control\G.SKILL Trident Z Lighting Control.exe",
            ]
            .iter()
            .map(PathBuf::from)
            .collect(),
            devices,
        )
    }

    /// MSI Mystic Light probe, covering MSI Center and both Dragon Center
    /// generations.
    pub fn msi_center(devices: Vec<ProxiedDevice>) -> Self {
        Self::new(
            "MSI",
            [
                r"C:\Program Files (x86)\MSI\MSI Center\MSI Center.exe",
                r"C:\Program Files\MSI\MSI Center\MSI Center.exe",
                r"C:\Program Files (x86)\MSI\One Dragon Center\Dragon Center.exe",
                r"C:\Program Files\MSI\One Dragon Center\Dragon Center.exe",
                r"C:\Program Files (x86)\MSI\Dragon Center\Dragon Center.exe",
                r"C:\Program Files\MSI\Dragon Center\Dragon Center.exe",
            ]
            .iter()
            .map(PathBuf::from)
            .collect(),
            devices,
        )
    }

    fn probe(&self) -> bool {
        let found = self.probe_paths.iter().any(|p| p.exists());
        self.detected.store(found, Ordering::Relaxed);
        found
    }
}

#[async_trait::async_trait]
impl ProtocolClient for VendorProxyClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProtocolKind {
        ProtocolKind::VendorProxy
    }

    async fn connect(&self) -> Result<(), Error> {
        if self.probe() {
            debug!(backend = %self.name, "vendor software detected");
            Ok(())
        } else {
            Err(Error::ConnectionRefused {
                endpoint: format!("{} control software", self.vendor),
            })
        }
    }

    async fn disconnect(&self) {
        self.detected.store(false, Ordering::Relaxed);
    }

    async fn list_devices(&self) -> Result<Vec<DeviceObservation>, Error> {
        if !self.probe() {
            // Nothing detected: an empty topology, not an error. The suite
            // being uninstalled is a normal state.
            return Ok(Vec::new());
        }

        Ok(self
            .devices
            .iter()
            .map(|d| DeviceObservation {
                vendor: self.vendor.clone(),
                serial_or_path: d.key.clone(),
                name: d.name.clone(),
                protocol: ProtocolKind::VendorProxy,
                zones: d
                    .zones
                    .iter()
                    .enumerate()
                    .map(|(i, (name, led_count))| ZoneObservation {
                        zone_id: u32::try_from(i).unwrap_or(u32::MAX),
                        name: Some(name.clone()),
                        led_count: *led_count,
                        color: None,
                    })
                    .collect(),
                capabilities: CapabilitySet::detection_only(),
                identity_hint: d.identity_hint.clone(),
            })
            .collect())
    }

    async fn set_zone_color(&self, device: &str, zone_id: u32, _color: Color) -> Result<(), Error> {
        Err(Error::UnsupportedOperation {
            operation: format!(
                "zone {zone_id} color on detection-only {} device {device}",
                self.vendor
            ),
        })
    }

    async fn set_effect(&self, device: &str, _effect: EffectDescriptor) -> Result<(), Error> {
        Err(Error::UnsupportedOperation {
            operation: format!("effect on detection-only {} device {device}", self.vendor),
        })
    }

    async fn heartbeat(&self) -> Result<(), Error> {
        if self.probe() {
            Ok(())
        } else {
            Err(Error::ConnectionRefused {
                endpoint: format!("{} control software", self.vendor),
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_device() -> ProxiedDevice {
        ProxiedDevice {
            name: "Phantom Gaming RX 7900XTX".to_string(),
            key: "asrock-gpu-0".to_string(),
            zones: vec![
                ("logo".to_string(), 8),
                ("fan_shroud".to_string(), 16),
                ("backplate".to_string(), 4),
            ],
            identity_hint: Some("pci/asrock-7900xtx".to_string()),
        }
    }

    #[test]
    fn stock_probes_cover_every_supported_vendor() {
        let clients = [
            VendorProxyClient::asrock_polychrome(Vec::new()),
            VendorProxyClient::lian_li_lconnect(Vec::new()),
            VendorProxyClient::gskill_aura(Vec::new()),
            VendorProxyClient::msi_center(Vec::new()),
        ];
        let names: Vec<&str> = clients.iter().map(VendorProxyClient::name).collect();
        assert_eq!(
            names,
            [
                "vendor-proxy@asrock",
                "vendor-proxy@lian li",
                "vendor-proxy@g.skill",
                "vendor-proxy@msi",
            ]
        );
        for client in &clients {
            assert!(!client.probe_paths.is_empty());
        }
    }

    #[tokio::test]
    async fn absent_software_reports_no_devices() {
        let client = VendorProxyClient::new(
            "ASRock",
            vec![PathBuf::from("/nonexistent/polychrome.exe")],
            vec![sample_device()],
        );
        assert!(client.list_devices().await.unwrap().is_empty());
        assert!(client.connect().await.is_err());
    }

    #[tokio::test]
    async fn present_software_reports_detection_only_devices() {
        let dir = std::env::temp_dir().join("lumen-vendor-probe-test");
        std::fs::create_dir_all(&dir).unwrap();
        let marker = dir.join("polychrome.exe");
        std::fs::write(&marker, b"").unwrap();

        let client =
            VendorProxyClient::new("ASRock", vec![marker.clone()], vec![sample_device()]);
        client.connect().await.unwrap();

        let devices = client.list_devices().await.unwrap();
        assert_eq!(devices.len(), 1);
        assert!(!devices[0].capabilities.is_controllable());
        assert_eq!(devices[0].zones.len(), 3);
        assert_eq!(
            devices[0].identity_hint.as_deref(),
            Some("pci/asrock-7900xtx")
        );

        std::fs::remove_file(marker).unwrap();
    }

    #[tokio::test]
    async fn control_commands_are_rejected() {
        let client = VendorProxyClient::new("ASRock", Vec::new(), vec![sample_device()]);
        let err = client
            .set_zone_color("asrock-gpu-0", 0, Color::new(255, 0, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperation { .. }));

        let err = client
            .set_effect("asrock-gpu-0", EffectDescriptor::off())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperation { .. }));
    }
}
