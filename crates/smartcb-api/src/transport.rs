// Shared transport configuration for building reqwest::Client instances.
//
// The connect-time client and the short-deadline probe clients share
// user agent and timeout handling through this module.

use std::time::Duration;

use crate::error::Error;

const USER_AGENT: &str = concat!("smartcb/", env!("CARGO_PKG_VERSION"));

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Whole-request timeout (connect + response).
    pub timeout: Duration,
    /// TCP connect timeout. Defaults to `timeout`.
    pub connect_timeout: Option<Duration>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            connect_timeout: None,
        }
    }
}

impl TransportConfig {
    /// Config tuned for a single discovery probe.
    pub fn probe(deadline: Duration) -> Self {
        Self {
            timeout: deadline,
            connect_timeout: Some(deadline),
        }
    }

    /// Build a `reqwest::Client` from this config.
    ///
    /// The device speaks plain HTTP on the LAN, so no TLS or cookie
    /// handling is configured. Idle pooling is disabled: the ESP32
    /// closes keep-alive sockets aggressively.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout.unwrap_or(self.timeout))
            .pool_max_idle_per_host(0)
            .user_agent(USER_AGENT)
            .build()
            .map_err(Error::Transport)
    }

    /// Timeout in whole milliseconds, for error reporting.
    pub fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}
