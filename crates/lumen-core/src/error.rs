// ── Core error types ──
//
// User-facing errors from lumen-core. Protocol-level failures are caught
// at the client boundary and become registry status changes or per-device
// apply outcomes; the variants here are for caller-level contract
// violations and coordinator lifecycle failures. The
// `From<lumen_proto::Error>` impl translates transport errors for the few
// paths that do bubble one up (initial connect, explicit rescan).

use thiserror::Error;

use crate::model::DeviceId;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach backend {backend}: {reason}")]
    BackendUnavailable { backend: String, reason: String },

    #[error("Operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Device not found: {id}")]
    DeviceNotFound { id: DeviceId },

    #[error("Operation not supported: {operation}")]
    Unsupported { operation: String },

    // ── Contract violations ──────────────────────────────────────────
    /// The profile structure handed to the engine is unusable. This is a
    /// caller bug, not a recoverable runtime condition.
    #[error("Invalid profile: {message}")]
    InvalidProfile { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<lumen_proto::Error> for CoreError {
    fn from(err: lumen_proto::Error) -> Self {
        match err {
            lumen_proto::Error::ConnectionRefused { endpoint } => CoreError::BackendUnavailable {
                backend: endpoint,
                reason: "connection refused".into(),
            },
            lumen_proto::Error::SessionExpired => CoreError::BackendUnavailable {
                backend: String::new(),
                reason: "session expired".into(),
            },
            lumen_proto::Error::Timeout { timeout_ms } => CoreError::Timeout { timeout_ms },
            lumen_proto::Error::UnsupportedOperation { operation } => {
                CoreError::Unsupported { operation }
            }
            lumen_proto::Error::DeviceNotFound { device } => CoreError::Internal(format!(
                "backend lost device {device} mid-operation"
            )),
            other => CoreError::Internal(other.to_string()),
        }
    }
}
