// ── Runtime tuning configuration ──
//
// These types describe *how* the coordinator runs: cycle intervals,
// offline thresholds, retry budgets. They never touch disk -- the consumer
// (CLI, UI) builds a `CoreConfig` and hands it in.

use std::time::Duration;

/// Retry budget for per-device command failures during profile application.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts per command, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each subsequent one.
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(200),
        }
    }
}

/// Tuning for the discovery scheduler, registry, and profile engine.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Fixed interval between discovery cycles. Zero disables the
    /// periodic task (on-demand rescans still work).
    pub discovery_interval: Duration,
    /// Per-client deadline within one discovery cycle. A client that
    /// exceeds it contributes nothing and is marked degraded.
    pub per_client_timeout: Duration,
    /// Interval between liveness probes. Must stay under the Chroma
    /// session-expiry window (~15s).
    pub heartbeat_interval: Duration,
    /// Consecutive discovery cycles a device may go unobserved before it
    /// transitions to Offline.
    pub offline_after_misses: u32,
    /// Retry budget for profile-application commands.
    pub retry: RetryPolicy,
    /// Devices driven concurrently during one profile application.
    pub max_concurrent_devices: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            discovery_interval: Duration::from_secs(30),
            per_client_timeout: Duration::from_secs(5),
            heartbeat_interval: Duration::from_secs(5),
            offline_after_misses: 3,
            retry: RetryPolicy::default(),
            max_concurrent_devices: 4,
        }
    }
}
