// ── Concurrent device table ──
//
// Lock-free reads with push-based change notification via a `watch`
// channel. Mutations go through `commit`, which replaces the table
// contents and publishes exactly one new snapshot, so observers never see
// a half-merged topology.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;

use crate::model::{Device, DeviceId};

pub(crate) struct DeviceTable {
    by_id: DashMap<DeviceId, Arc<Device>>,
    /// Full snapshot, rebuilt once per commit.
    snapshot: watch::Sender<Arc<Vec<Arc<Device>>>>,
}

impl DeviceTable {
    pub(crate) fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            by_id: DashMap::new(),
            snapshot,
        }
    }

    pub(crate) fn get(&self, id: DeviceId) -> Option<Arc<Device>> {
        self.by_id.get(&id).map(|r| Arc::clone(r.value()))
    }

    pub(crate) fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Current snapshot (cheap `Arc` clone), sorted by name for stable
    /// presentation.
    pub(crate) fn snapshot(&self) -> Arc<Vec<Arc<Device>>> {
        self.snapshot.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<Device>>>> {
        self.snapshot.subscribe()
    }

    /// Replace the table contents with `records` and publish one snapshot.
    pub(crate) fn commit(&self, records: HashMap<DeviceId, Device>) {
        let stale: Vec<DeviceId> = self
            .by_id
            .iter()
            .map(|r| *r.key())
            .filter(|id| !records.contains_key(id))
            .collect();
        for (id, device) in records {
            self.by_id.insert(id, Arc::new(device));
        }
        for id in stale {
            self.by_id.remove(&id);
        }

        let mut values: Vec<Arc<Device>> =
            self.by_id.iter().map(|r| Arc::clone(r.value())).collect();
        values.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
    }

    /// Clone the current records for a read-modify-commit cycle.
    pub(crate) fn to_map(&self) -> HashMap<DeviceId, Device> {
        self.by_id
            .iter()
            .map(|r| (*r.key(), (**r.value()).clone()))
            .collect()
    }
}
