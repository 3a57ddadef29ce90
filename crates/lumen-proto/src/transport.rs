// Shared transport configuration for building reqwest::Client instances.
//
// The Chroma backend is plain-HTTP on localhost, so there is no TLS knob;
// only timeout and identification are tunable.

use std::time::Duration;

/// Transport settings for HTTP-based backends.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Per-request timeout applied by the underlying client.
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            user_agent: concat!("lumen/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .build()
            .map_err(crate::error::Error::Transport)
    }
}
