// ── Domain model ──

pub mod apply;
pub mod device;
pub mod profile;

pub use apply::{ApplyResult, DeviceOutcome};
pub use device::{ConnectionStatus, Device, DeviceId, Zone};
pub use profile::{Profile, ProfileEntry, Target, ZoneSelector};
