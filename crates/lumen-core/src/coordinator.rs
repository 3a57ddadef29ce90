// ── Lighting coordinator ──
//
// The crate's facade: owns the protocol clients, registry, discovery
// scheduler, profile engine, and state synchronizer, and wires their
// background tasks together. Consumers (CLI, UI) hold a cheap clone and
// call the high-level operations.

use std::sync::Arc;

use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use lumen_proto::ProtocolClient;

use crate::config::CoreConfig;
use crate::discovery::{DiscoveryScheduler, heartbeat_task};
use crate::engine::ProfileEngine;
use crate::error::CoreError;
use crate::model::{ApplyResult, Device, DeviceId, Profile};
use crate::registry::{DeviceRegistry, RegistryEvent};
use crate::sync::StateSynchronizer;

/// Cheaply cloneable handle to the running core.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    config: CoreConfig,
    clients: Vec<Arc<dyn ProtocolClient>>,
    registry: Arc<DeviceRegistry>,
    scheduler: Arc<DiscoveryScheduler>,
    engine: Arc<ProfileEngine>,
    synchronizer: Arc<StateSynchronizer>,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Coordinator {
    pub fn new(config: CoreConfig, clients: Vec<Arc<dyn ProtocolClient>>) -> Self {
        let registry = Arc::new(DeviceRegistry::new(config.offline_after_misses));
        let scheduler = Arc::new(DiscoveryScheduler::new(
            clients.clone(),
            Arc::clone(&registry),
            config.per_client_timeout,
        ));
        let engine = Arc::new(ProfileEngine::new(
            clients.clone(),
            config.retry,
            config.max_concurrent_devices,
        ));
        let synchronizer = Arc::new(StateSynchronizer::new(
            Arc::clone(&engine),
            Arc::clone(&registry),
        ));
        Self {
            inner: Arc::new(CoordinatorInner {
                config,
                clients,
                registry,
                scheduler,
                engine,
                synchronizer,
                cancel: CancellationToken::new(),
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Connect clients and start the background tasks.
    ///
    /// A client that fails to connect is logged and left registered; its
    /// devices surface once discovery reaches it. Returns `Err` only when
    /// *no* client connected.
    pub async fn start(&self) -> Result<(), CoreError> {
        let mut connected = 0usize;
        for client in &self.inner.clients {
            match client.connect().await {
                Ok(()) => {
                    debug!(backend = client.name(), "backend connected");
                    connected += 1;
                }
                Err(e) => {
                    warn!(backend = client.name(), error = %e, "backend unavailable at startup");
                }
            }
        }
        if connected == 0 && !self.inner.clients.is_empty() {
            return Err(CoreError::BackendUnavailable {
                backend: "all".into(),
                reason: "no protocol backend reachable".into(),
            });
        }

        let mut handles = self.inner.tasks.lock().await;

        let cancel = self.inner.cancel.child_token();
        let scheduler = Arc::clone(&self.inner.scheduler);
        let period = self.inner.config.discovery_interval;
        handles.push(tokio::spawn(scheduler.run(period, cancel)));

        let heartbeat = self.inner.config.heartbeat_interval;
        if !heartbeat.is_zero() {
            let cancel = self.inner.cancel.child_token();
            handles.push(tokio::spawn(heartbeat_task(
                self.inner.clients.clone(),
                Arc::clone(&self.inner.registry),
                heartbeat,
                cancel,
            )));
        }

        let cancel = self.inner.cancel.child_token();
        let synchronizer = Arc::clone(&self.inner.synchronizer);
        handles.push(tokio::spawn(synchronizer.run(cancel)));

        info!(
            backends = self.inner.clients.len(),
            connected, "coordinator started"
        );
        Ok(())
    }

    /// Stop background tasks and disconnect every client.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let handles: Vec<_> = self.inner.tasks.lock().await.drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }
        for client in &self.inner.clients {
            client.disconnect().await;
        }
        info!("coordinator stopped");
    }

    // ── Discovery ────────────────────────────────────────────────────

    /// Run one discovery cycle now and wait for it to land.
    pub async fn rescan(&self) {
        self.inner.scheduler.run_cycle().await;
    }

    /// Queue a discovery cycle without waiting for it.
    pub fn request_rescan(&self) {
        self.inner.scheduler.request_rescan();
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn devices(&self) -> Arc<Vec<Arc<Device>>> {
        self.inner.registry.snapshot()
    }

    pub fn device(&self, id: DeviceId) -> Option<Arc<Device>> {
        self.inner.registry.get(id)
    }

    pub fn watch_devices(&self) -> watch::Receiver<Arc<Vec<Arc<Device>>>> {
        self.inner.registry.watch()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.inner.registry.subscribe()
    }

    // ── Control ──────────────────────────────────────────────────────

    /// Apply a profile against the current snapshot and track the result
    /// for reconnect replay.
    pub async fn apply(&self, profile: &Profile) -> Result<ApplyResult, CoreError> {
        let snapshot = self.inner.registry.snapshot();
        let cancel = self.inner.cancel.child_token();
        let result = self.inner.engine.apply(profile, &snapshot, &cancel).await?;
        self.inner.synchronizer.record(profile, &result).await;
        Ok(result)
    }

    /// Turn every controllable online device off and drop tracked state.
    pub async fn off(&self) -> Result<ApplyResult, CoreError> {
        let snapshot = self.inner.registry.snapshot();
        let cancel = self.inner.cancel.child_token();
        let result = self.inner.engine.all_off(&snapshot, &cancel).await?;
        self.inner.synchronizer.clear().await;
        Ok(result)
    }

    /// Explicitly forget a device.
    pub async fn forget(&self, id: DeviceId) -> bool {
        self.inner.registry.remove(id).await
    }
}
