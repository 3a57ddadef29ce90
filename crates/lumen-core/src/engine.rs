// ── Profile application engine ──
//
// Turns a profile into protocol commands. Devices are driven in parallel
// under a concurrency cap; commands for one device are strictly sequential
// and in profile order. Failure is per-device: one unreachable backend
// never aborts the rest of the run, the gap is reported in the
// `ApplyResult` instead.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use lumen_proto::{Color, EffectDescriptor, ProtocolClient};

use crate::config::RetryPolicy;
use crate::error::CoreError;
use crate::model::{
    ApplyResult, Device, DeviceId, DeviceOutcome, Profile, ProfileEntry, Target, ZoneSelector,
};

pub struct ProfileEngine {
    /// Control clients keyed by backend name (`Device::backend` routes here).
    clients: HashMap<String, Arc<dyn ProtocolClient>>,
    retry: RetryPolicy,
    limiter: Arc<Semaphore>,
}

impl ProfileEngine {
    pub fn new(
        clients: Vec<Arc<dyn ProtocolClient>>,
        retry: RetryPolicy,
        max_concurrent_devices: usize,
    ) -> Self {
        let clients = clients
            .into_iter()
            .map(|c| (c.name().to_string(), c))
            .collect();
        Self {
            clients,
            retry,
            limiter: Arc::new(Semaphore::new(max_concurrent_devices.max(1))),
        }
    }

    /// Apply `profile` against a point-in-time device snapshot.
    ///
    /// Returns `Err` only for contract violations (empty profile); every
    /// runtime failure lands as a per-device outcome in the result.
    /// Cancellation is graceful: devices not yet started are Skipped,
    /// in-flight devices finish their current command.
    pub async fn apply(
        &self,
        profile: &Profile,
        snapshot: &[Arc<Device>],
        cancel: &CancellationToken,
    ) -> Result<ApplyResult, CoreError> {
        if profile.is_empty() {
            return Err(CoreError::InvalidProfile {
                message: "profile has no entries".into(),
            });
        }

        let devices: HashMap<DeviceId, Arc<Device>> =
            snapshot.iter().map(|d| (d.id, Arc::clone(d))).collect();

        let tasks = profile.partition().into_iter().map(|(id, entries)| {
            let device = devices.get(&id).cloned();
            async move {
                let Some(device) = device else {
                    debug!(device = %id, "not in registry, skipping");
                    return (id, DeviceOutcome::Skipped);
                };
                if !device.status.is_online() {
                    debug!(device = %device.name, status = ?device.status, "not online, skipping");
                    return (id, DeviceOutcome::Skipped);
                }
                let Some(client) = self.clients.get(&device.backend) else {
                    return (
                        id,
                        DeviceOutcome::Failed {
                            reason: format!("no client for backend {}", device.backend),
                        },
                    );
                };

                let Ok(_permit) = self.limiter.acquire().await else {
                    return (id, DeviceOutcome::Skipped);
                };
                if cancel.is_cancelled() {
                    return (id, DeviceOutcome::Skipped);
                }

                (id, self.drive_device(client.as_ref(), &device, &entries).await)
            }
        });

        let mut result = ApplyResult::new(&profile.name);
        for (id, outcome) in join_all(tasks).await {
            result.record(id, outcome);
        }
        debug!(%result, "profile application finished");
        Ok(result)
    }

    /// Issue one device's commands sequentially, in entry order.
    async fn drive_device(
        &self,
        client: &dyn ProtocolClient,
        device: &Device,
        entries: &[ProfileEntry],
    ) -> DeviceOutcome {
        for entry in entries {
            if let Err(reason) = self.issue(client, device, entry).await {
                warn!(device = %device.name, %reason, "command failed");
                return DeviceOutcome::Failed { reason };
            }
        }
        DeviceOutcome::Applied
    }

    /// Issue a single command with the retry budget. Transient errors are
    /// retried with doubling backoff; permanent ones fail immediately.
    async fn issue(
        &self,
        client: &dyn ProtocolClient,
        device: &Device,
        entry: &ProfileEntry,
    ) -> Result<(), String> {
        let mut backoff = self.retry.base_backoff;
        let mut attempt = 1;
        loop {
            let outcome = match (entry.zone, entry.target) {
                (ZoneSelector::Zone(zone_id), Target::Color(color)) => {
                    client.set_zone_color(&device.address, zone_id, color).await
                }
                (ZoneSelector::Device, Target::Color(color)) => {
                    client
                        .set_effect(&device.address, EffectDescriptor::static_color(color))
                        .await
                }
                // A zone-scoped effect degrades to a device-wide one: no
                // backend exposes per-zone effect engines.
                (_, Target::Effect(effect)) => client.set_effect(&device.address, effect).await,
            };

            let err = match outcome {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };
            // Retry transient failures and expired sessions (the Chroma
            // client re-registers on next use); everything else is settled
            // on the first answer.
            let retriable = err.is_transient() || err.is_session_expired();
            if !retriable || attempt >= self.retry.max_attempts {
                return Err(err.to_string());
            }
            debug!(device = %device.name, attempt, error = %err, "retrying command");
            tokio::time::sleep(backoff).await;
            backoff *= 2;
            attempt += 1;
        }
    }

    /// Turn every controllable online device in the snapshot off.
    pub async fn all_off(
        &self,
        snapshot: &[Arc<Device>],
        cancel: &CancellationToken,
    ) -> Result<ApplyResult, CoreError> {
        let profile = Profile::all_off(snapshot);
        if profile.is_empty() {
            // Nothing controllable is online; report an empty success.
            return Ok(ApplyResult::new(&profile.name));
        }
        self.apply(&profile, snapshot, cancel).await
    }

    /// Convenience wrapper for a single-zone color change outside any
    /// profile.
    pub async fn set_zone(
        &self,
        device: &Device,
        zone_id: u32,
        color: Color,
    ) -> Result<(), CoreError> {
        let client = self
            .clients
            .get(&device.backend)
            .ok_or_else(|| CoreError::BackendUnavailable {
                backend: device.backend.clone(),
                reason: "no client registered".into(),
            })?;
        let entry = ProfileEntry {
            device: device.id,
            zone: ZoneSelector::Zone(zone_id),
            target: Target::Color(color),
        };
        self.issue(client.as_ref(), device, &entry)
            .await
            .map_err(CoreError::Internal)
    }
}
