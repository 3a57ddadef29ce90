use thiserror::Error;

/// Top-level error type for the `lumen-proto` crate.
///
/// Covers every failure mode a protocol backend can produce. `lumen-core`
/// maps these into registry status changes or per-device apply outcomes --
/// they never surface as process-wide failures.
#[derive(Debug, Error)]
pub enum Error {
    // ── Connection ──────────────────────────────────────────────────
    /// The backend is not running or refused the connection.
    #[error("Connection refused by backend at {endpoint}")]
    ConnectionRefused { endpoint: String },

    /// A request or connect attempt exceeded its deadline.
    #[error("Protocol timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The backend session was revoked or expired (Chroma heartbeat lapse).
    #[error("Session expired -- reconnect required")]
    SessionExpired,

    // ── Protocol ────────────────────────────────────────────────────
    /// Malformed or unexpected response from the backend.
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// The addressed device is unknown to this backend.
    #[error("Device not found: {device}")]
    DeviceNotFound { device: String },

    /// The operation is outside the device's capability set.
    #[error("Unsupported operation: {operation}")]
    UnsupportedOperation { operation: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (Chroma REST backend).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Socket-level I/O error (OpenRGB TCP backend).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// URL construction error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Protocol { .. } => true,
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }

    /// Returns `true` if the session must be re-established before retrying.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }
}
