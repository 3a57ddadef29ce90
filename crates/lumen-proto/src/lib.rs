// lumen-proto: Async protocol clients for RGB lighting backends

pub mod chroma;
pub mod client;
pub mod color;
pub mod error;
pub mod openrgb;
pub mod report;
pub mod transport;
pub mod vendor;

pub use chroma::{ChromaClient, ChromaConfig, ChromaDeviceSpec};
pub use client::{ProtocolClient, ProtocolKind};
pub use color::{Color, EffectDescriptor, EffectKind};
pub use error::Error;
pub use openrgb::OpenRgbClient;
pub use report::{CapabilitySet, DeviceObservation, ZoneObservation};
pub use transport::TransportConfig;
pub use vendor::{ProxiedDevice, VendorProxyClient};
