// ── State synchronizer ──
//
// Remembers the last successfully applied target per device and replays
// it when a device comes back Online. Only devices whose outcome was
// Applied are tracked: a device that failed or was skipped has no known
// desired state to restore.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, broadcast};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::ProfileEngine;
use crate::model::{ApplyResult, ConnectionStatus, DeviceId, Profile, ProfileEntry};
use crate::registry::{DeviceRegistry, RegistryEvent};

/// The replayable target for one device.
#[derive(Debug, Clone)]
struct DesiredState {
    profile: String,
    entries: Vec<ProfileEntry>,
}

pub struct StateSynchronizer {
    engine: Arc<ProfileEngine>,
    registry: Arc<DeviceRegistry>,
    desired: Mutex<HashMap<DeviceId, DesiredState>>,
}

impl StateSynchronizer {
    pub fn new(engine: Arc<ProfileEngine>, registry: Arc<DeviceRegistry>) -> Self {
        Self {
            engine,
            registry,
            desired: Mutex::new(HashMap::new()),
        }
    }

    /// Record the outcome of a profile application. Devices that ended
    /// Applied adopt the profile's entries as their desired state; failed
    /// and skipped devices keep whatever was recorded before.
    pub async fn record(&self, profile: &Profile, result: &ApplyResult) {
        let mut desired = self.desired.lock().await;
        for id in result.applied_devices() {
            let entries = profile.restricted_to(id).entries;
            if entries.is_empty() {
                continue;
            }
            desired.insert(
                id,
                DesiredState {
                    profile: profile.name.clone(),
                    entries,
                },
            );
        }
    }

    /// Forget all desired state (after an explicit all-off).
    pub async fn clear(&self) {
        self.desired.lock().await.clear();
    }

    /// Number of devices with a tracked desired state.
    pub async fn tracked(&self) -> usize {
        self.desired.lock().await.len()
    }

    /// Replay the desired state for one device, if any is tracked.
    pub async fn reconcile(&self, id: DeviceId, cancel: &CancellationToken) {
        let state = match self.desired.lock().await.get(&id) {
            Some(s) => s.clone(),
            None => return,
        };
        let profile = Profile {
            name: state.profile,
            entries: state.entries,
        };
        let snapshot = self.registry.snapshot();
        match self.engine.apply(&profile, &snapshot, cancel).await {
            Ok(result) if result.is_fully_applied() => {
                info!(device = %id, profile = %profile.name, "restored state after reconnect");
            }
            Ok(result) => {
                warn!(device = %id, %result, "partial state restore after reconnect");
            }
            Err(e) => {
                warn!(device = %id, error = %e, "state restore failed");
            }
        }
    }

    /// Event loop: watches registry status changes and reconciles devices
    /// that transition back to Online.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut events = self.registry.subscribe();
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                event = events.recv() => match event {
                    Ok(RegistryEvent::StatusChanged {
                        id,
                        from,
                        to: ConnectionStatus::Online,
                        ..
                    }) if from != ConnectionStatus::Online => {
                        debug!(device = %id, ?from, "device back online, reconciling");
                        self.reconcile(id, &cancel).await;
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "synchronizer lagged behind registry events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    }
}
