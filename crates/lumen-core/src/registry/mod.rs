// ── Device registry ──
//
// Single authoritative store for all known devices. Single-writer
// discipline: only the discovery scheduler and the heartbeat path mutate
// it; everything else reads point-in-time snapshots. Devices are never
// deleted by discovery -- after enough missed cycles they go Offline with
// their last-known zone state preserved for reconnection.

mod table;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, broadcast, watch};
use tracing::{debug, info};

use lumen_proto::DeviceObservation;

use crate::model::{ConnectionStatus, Device, DeviceId, Zone};
use table::DeviceTable;

const EVENT_CHANNEL_SIZE: usize = 256;

/// Change notification emitted after registry mutations.
///
/// Delivery is best-effort over a `broadcast` channel: lagging subscribers
/// drop events, and the mutation path never blocks on them.
#[derive(Debug, Clone)]
pub enum RegistryEvent {
    Added(Arc<Device>),
    StatusChanged {
        id: DeviceId,
        name: String,
        from: ConnectionStatus,
        to: ConnectionStatus,
    },
    Removed(DeviceId),
}

/// Everything one backend contributed to a discovery cycle.
#[derive(Debug)]
pub struct BackendReport {
    pub backend: String,
    /// `Err` carries the failure text; the backend is treated as degraded
    /// for this cycle and contributes no observations.
    pub outcome: Result<Vec<DeviceObservation>, String>,
}

/// The canonical, deduplicated device store.
pub struct DeviceRegistry {
    table: DeviceTable,
    events: broadcast::Sender<RegistryEvent>,
    /// Consecutive missed cycles before a device transitions Offline.
    offline_after_misses: u32,
    /// Serializes mutations; reads stay lock-free.
    write_lock: Mutex<()>,
}

impl DeviceRegistry {
    pub fn new(offline_after_misses: u32) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            table: DeviceTable::new(),
            events,
            offline_after_misses,
            write_lock: Mutex::new(()),
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn get(&self, id: DeviceId) -> Option<Arc<Device>> {
        self.table.get(id)
    }

    pub fn device_count(&self) -> usize {
        self.table.len()
    }

    /// Point-in-time snapshot of every known device.
    pub fn snapshot(&self) -> Arc<Vec<Arc<Device>>> {
        self.table.snapshot()
    }

    /// Reactive snapshot subscription (new value per commit).
    pub fn watch(&self) -> watch::Receiver<Arc<Vec<Arc<Device>>>> {
        self.table.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Merge one discovery cycle into the registry as a single atomic
    /// update.
    ///
    /// Observed devices are upserted in place (dedup by canonical id --
    /// two reports with the same identity never produce two records).
    /// Devices unobserved by a healthy backend accrue a miss and go
    /// Offline after the configured threshold; devices of a degraded
    /// backend are marked Degraded without accruing misses.
    pub async fn merge_cycle(&self, reports: Vec<BackendReport>) {
        let _guard = self.write_lock.lock().await;

        let mut next = self.table.to_map();
        let mut events = Vec::new();
        let mut added = Vec::new();
        let mut seen: HashSet<DeviceId> = HashSet::new();
        let mut degraded_backends: HashSet<String> = HashSet::new();

        for report in reports {
            let observations = match report.outcome {
                Ok(obs) => obs,
                Err(reason) => {
                    debug!(backend = %report.backend, %reason, "backend degraded for this cycle");
                    degraded_backends.insert(report.backend);
                    continue;
                }
            };
            for obs in observations {
                let id = DeviceId::of(&obs);
                seen.insert(id);
                match next.get_mut(&id) {
                    Some(existing) => {
                        let from = existing.status;
                        refresh_record(existing, &report.backend, &obs);
                        if from != ConnectionStatus::Online {
                            events.push(RegistryEvent::StatusChanged {
                                id,
                                name: existing.name.clone(),
                                from,
                                to: ConnectionStatus::Online,
                            });
                        }
                    }
                    None => {
                        let device = Device::from_observation(&report.backend, &obs);
                        next.insert(id, device);
                        added.push(id);
                    }
                }
            }
        }

        for (id, device) in &mut next {
            if seen.contains(id) {
                continue;
            }
            if degraded_backends.contains(&device.backend) {
                if device.status == ConnectionStatus::Online {
                    events.push(RegistryEvent::StatusChanged {
                        id: *id,
                        name: device.name.clone(),
                        from: device.status,
                        to: ConnectionStatus::Degraded,
                    });
                    device.status = ConnectionStatus::Degraded;
                }
                // No miss counted: the backend did not answer, so absence
                // says nothing about the device.
            } else {
                device.misses += 1;
                if device.misses >= self.offline_after_misses
                    && device.status != ConnectionStatus::Offline
                {
                    info!(device = %device.name, misses = device.misses, "device offline");
                    events.push(RegistryEvent::StatusChanged {
                        id: *id,
                        name: device.name.clone(),
                        from: device.status,
                        to: ConnectionStatus::Offline,
                    });
                    device.status = ConnectionStatus::Offline;
                }
            }
        }

        self.table.commit(next);

        for id in added {
            if let Some(device) = self.table.get(id) {
                debug!(device = %device.name, id = %id, "device added");
                let _ = self.events.send(RegistryEvent::Added(device));
            }
        }
        for event in events {
            let _ = self.events.send(event);
        }
    }

    /// Mark every non-offline device of `backend` as Degraded. Used by the
    /// heartbeat path when a liveness probe fails between cycles.
    pub async fn mark_backend_degraded(&self, backend: &str) {
        let _guard = self.write_lock.lock().await;

        let mut next = self.table.to_map();
        let mut events = Vec::new();
        for (id, device) in &mut next {
            if device.backend == backend && device.status == ConnectionStatus::Online {
                events.push(RegistryEvent::StatusChanged {
                    id: *id,
                    name: device.name.clone(),
                    from: device.status,
                    to: ConnectionStatus::Degraded,
                });
                device.status = ConnectionStatus::Degraded;
            }
        }
        if events.is_empty() {
            return;
        }
        self.table.commit(next);
        for event in events {
            let _ = self.events.send(event);
        }
    }

    /// Explicitly forget a device (user-initiated).
    pub async fn remove(&self, id: DeviceId) -> bool {
        let _guard = self.write_lock.lock().await;

        let mut next = self.table.to_map();
        let removed = next.remove(&id).is_some();
        if removed {
            self.table.commit(next);
            let _ = self.events.send(RegistryEvent::Removed(id));
        }
        removed
    }
}

/// Update an existing record from a fresh observation.
///
/// A detection-only observation never downgrades a record a controllable
/// backend owns; the reverse upgrade always wins.
fn refresh_record(existing: &mut Device, backend: &str, obs: &DeviceObservation) {
    let upgrade = obs.capabilities.is_controllable() || !existing.capabilities.is_controllable();
    if upgrade {
        existing.name = obs.name.clone();
        existing.backend = backend.to_string();
        existing.address = obs.serial_or_path.clone();
        existing.protocol = obs.protocol;
        existing.capabilities = obs.capabilities.clone();
        existing.zones = obs
            .zones
            .iter()
            .map(|z| Zone {
                id: z.zone_id,
                name: z.name.clone(),
                led_count: z.led_count,
                // Keep a previously known color when the backend reports none.
                color: z.color.or_else(|| {
                    existing
                        .zones
                        .iter()
                        .find(|old| old.id == z.zone_id)
                        .and_then(|old| old.color)
                }),
            })
            .collect();
    }
    existing.status = ConnectionStatus::Online;
    existing.misses = 0;
    existing.last_seen = Some(Utc::now());
}
