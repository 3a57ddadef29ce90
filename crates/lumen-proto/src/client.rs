// ── Protocol client abstraction ──
//
// One trait, variant implementations selected by protocol kind. Each
// client owns exactly one live connection (socket or HTTP session) to one
// backend; sessions are never shared across clients.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::color::{Color, EffectDescriptor};
use crate::error::Error;
use crate::report::DeviceObservation;

/// Which protocol family a client speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolKind {
    /// OpenRGB server, binary length-framed TCP.
    OpenRgb,
    /// Razer Chroma SDK, local REST with a heartbeat-kept session.
    Chroma,
    /// Detection-only vendor software probe, no control channel.
    VendorProxy,
}

impl std::fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::OpenRgb => "openrgb",
            Self::Chroma => "chroma",
            Self::VendorProxy => "vendor-proxy",
        };
        f.write_str(name)
    }
}

/// A client for one hardware-control backend.
///
/// Implementations hold their connection behind interior mutability so a
/// shared reference can issue commands; the connection itself is guarded so
/// two in-flight commands never interleave on the wire.
///
/// Error conversion happens at this boundary: callers receive the
/// [`Error`] taxonomy, never backend-specific failures.
#[async_trait]
pub trait ProtocolClient: Send + Sync {
    /// Backend label for logs and degraded-status reporting,
    /// e.g. `"openrgb@localhost:6742"`.
    fn name(&self) -> &str;

    fn kind(&self) -> ProtocolKind;

    /// Establish the backend connection.
    ///
    /// Fails with [`Error::ConnectionRefused`] when the backend is not
    /// running, or [`Error::Timeout`].
    async fn connect(&self) -> Result<(), Error>;

    /// Release the connection. Idempotent; never fails.
    async fn disconnect(&self);

    /// Return the current device/zone topology as seen by this backend.
    ///
    /// Has no side effects on any registry -- the caller merges. Fails with
    /// [`Error::Timeout`] or [`Error::Protocol`].
    async fn list_devices(&self) -> Result<Vec<DeviceObservation>, Error>;

    /// Set one zone of one device to a solid color.
    async fn set_zone_color(&self, device: &str, zone_id: u32, color: Color) -> Result<(), Error>;

    /// Apply a device-wide effect.
    async fn set_effect(&self, device: &str, effect: EffectDescriptor) -> Result<(), Error>;

    /// Lightweight liveness probe.
    ///
    /// Used to detect silent disconnects between discovery cycles. A
    /// [`Error::SessionExpired`] return means the client has dropped its
    /// session and will reconnect on next use.
    async fn heartbeat(&self) -> Result<(), Error>;
}
