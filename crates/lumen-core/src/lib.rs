//! Device registry, discovery, and profile-application layer for lumen.
//!
//! This crate owns the business logic between the protocol clients in
//! `lumen-proto` and UI consumers (CLI):
//!
//! - **[`Coordinator`]** — Central facade managing the full lifecycle:
//!   [`start()`](Coordinator::start) connects backends and spawns the
//!   discovery, heartbeat, and reconciliation tasks;
//!   [`apply()`](Coordinator::apply) drives a profile onto the hardware.
//!
//! - **[`DeviceRegistry`]** — The canonical, deduplicated device store
//!   (`DashMap` + `tokio::sync::watch` snapshots). Devices are identified
//!   by a stable [`DeviceId`] digest so repeated discovery and multiple
//!   backends converge on one record.
//!
//! - **[`DiscoveryScheduler`]** — Periodic and on-demand enumeration
//!   across all backends, with per-client deadlines and soft degradation.
//!
//! - **[`ProfileEngine`]** — Applies a [`Profile`] with bounded
//!   concurrency, per-device sequential ordering, and per-command retry.
//!   Partial failure is reported per device in an [`ApplyResult`].
//!
//! - **[`StateSynchronizer`]** — Replays the last applied state onto
//!   devices that reconnect.

pub mod config;
pub mod coordinator;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod model;
pub mod registry;
pub mod sync;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{CoreConfig, RetryPolicy};
pub use coordinator::Coordinator;
pub use discovery::DiscoveryScheduler;
pub use engine::ProfileEngine;
pub use error::CoreError;
pub use registry::{BackendReport, DeviceRegistry, RegistryEvent};
pub use sync::StateSynchronizer;

// Re-export model types at the crate root for ergonomics.
pub use model::{
    ApplyResult, ConnectionStatus, Device, DeviceId, DeviceOutcome, Profile, ProfileEntry, Target,
    Zone, ZoneSelector,
};
