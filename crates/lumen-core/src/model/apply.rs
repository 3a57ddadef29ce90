// ── Profile application results ──

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::device::DeviceId;

/// Per-device outcome of one profile application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum DeviceOutcome {
    /// Every command for the device succeeded.
    Applied,
    /// A command failed after exhausting retries.
    Failed { reason: String },
    /// The device was absent, offline, or the run was cancelled before
    /// its task started.
    Skipped,
}

impl DeviceOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Result of one profile-application run: one outcome per targeted device.
///
/// An apply never fails atomically -- partiality is always reported here,
/// per device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyResult {
    pub profile: String,
    /// BTreeMap for deterministic iteration in logs and output.
    pub outcomes: BTreeMap<DeviceId, DeviceOutcome>,
}

impl ApplyResult {
    pub(crate) fn new(profile: &str) -> Self {
        Self {
            profile: profile.to_string(),
            outcomes: BTreeMap::new(),
        }
    }

    pub(crate) fn record(&mut self, device: DeviceId, outcome: DeviceOutcome) {
        self.outcomes.insert(device, outcome);
    }

    pub fn applied(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_applied()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| matches!(o, DeviceOutcome::Failed { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| matches!(o, DeviceOutcome::Skipped))
            .count()
    }

    /// `true` when every targeted device ended `Applied`.
    pub fn is_fully_applied(&self) -> bool {
        self.outcomes.values().all(DeviceOutcome::is_applied)
    }

    /// Device ids that ended `Applied`.
    pub fn applied_devices(&self) -> impl Iterator<Item = DeviceId> + '_ {
        self.outcomes
            .iter()
            .filter(|(_, o)| o.is_applied())
            .map(|(id, _)| *id)
    }
}

impl std::fmt::Display for ApplyResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} applied, {} failed, {} skipped",
            self.profile,
            self.applied(),
            self.failed(),
            self.skipped()
        )
    }
}
