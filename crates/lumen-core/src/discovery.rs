// ── Discovery scheduler ──
//
// Drives periodic and on-demand discovery cycles across all registered
// protocol clients. One cycle enumerates every client in parallel under a
// per-client deadline and merges the results into the registry as a single
// atomic update. A client that errors or times out degrades softly: its
// devices are marked Degraded for the cycle, the other clients' results
// still land.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::{Mutex, Notify};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use lumen_proto::ProtocolClient;

use crate::registry::{BackendReport, DeviceRegistry};

pub struct DiscoveryScheduler {
    clients: Vec<Arc<dyn ProtocolClient>>,
    registry: Arc<DeviceRegistry>,
    per_client_timeout: Duration,
    rescan: Notify,
    /// Held for the duration of a cycle so overlapping triggers coalesce
    /// into at most one in-flight enumeration.
    cycle_lock: Mutex<()>,
}

impl DiscoveryScheduler {
    pub fn new(
        clients: Vec<Arc<dyn ProtocolClient>>,
        registry: Arc<DeviceRegistry>,
        per_client_timeout: Duration,
    ) -> Self {
        Self {
            clients,
            registry,
            per_client_timeout,
            rescan: Notify::new(),
            cycle_lock: Mutex::new(()),
        }
    }

    /// Request an out-of-band discovery cycle. Returns immediately; the
    /// scheduler loop picks it up. Multiple pending requests coalesce.
    pub fn request_rescan(&self) {
        self.rescan.notify_one();
    }

    /// Run one full discovery cycle and merge it into the registry.
    ///
    /// Callers racing this method serialize on the cycle lock, so a
    /// triggered rescan never interleaves with the periodic task.
    pub async fn run_cycle(&self) {
        let _guard = self.cycle_lock.lock().await;

        let futures = self.clients.iter().map(|client| {
            let deadline = self.per_client_timeout;
            async move {
                let backend = client.name().to_string();
                let outcome = match timeout(deadline, client.list_devices()).await {
                    Ok(Ok(observations)) => Ok(observations),
                    Ok(Err(e)) => {
                        warn!(backend = %backend, error = %e, "discovery failed");
                        Err(e.to_string())
                    }
                    Err(_) => {
                        warn!(backend = %backend, timeout_ms = deadline.as_millis() as u64,
                              "discovery timed out");
                        Err(format!("enumeration exceeded {}ms", deadline.as_millis()))
                    }
                };
                BackendReport { backend, outcome }
            }
        });
        let reports = join_all(futures).await;

        let healthy = reports.iter().filter(|r| r.outcome.is_ok()).count();
        debug!(
            backends = reports.len(),
            healthy,
            "discovery cycle complete"
        );
        self.registry.merge_cycle(reports).await;
    }

    /// Periodic discovery loop. Runs one immediate cycle, then fires on
    /// the interval or on a rescan request, until cancelled. A zero
    /// interval disables the timer; rescan requests still work.
    pub async fn run(self: Arc<Self>, period: Duration, cancel: CancellationToken) {
        self.run_cycle().await;

        if period.is_zero() {
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = self.rescan.notified() => self.run_cycle().await,
                }
            }
            return;
        }

        let mut interval = tokio::time::interval(period);
        interval.tick().await; // consume the immediate first tick

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = self.rescan.notified() => self.run_cycle().await,
                _ = interval.tick() => self.run_cycle().await,
            }
        }
    }
}

/// Liveness probe loop. Each tick heartbeats every client; a failing
/// client's devices are marked Degraded ahead of the next discovery
/// cycle, which is what lets session-scoped backends (Chroma) get
/// re-registered before their server drops the session.
pub async fn heartbeat_task(
    clients: Vec<Arc<dyn ProtocolClient>>,
    registry: Arc<DeviceRegistry>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                for client in &clients {
                    if let Err(e) = client.heartbeat().await {
                        debug!(backend = client.name(), error = %e, "heartbeat failed");
                        registry.mark_backend_degraded(client.name()).await;
                    }
                }
            }
        }
    }
}
