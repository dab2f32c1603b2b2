// ── Device endpoint ──

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Port the firmware's web server listens on.
pub const DEFAULT_PORT: u16 = 80;

/// Network address of a candidate or connected breaker.
///
/// Hosts are dotted-quad IPv4 only: the device never registers a DNS
/// name and has no IPv6 stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceEndpoint {
    pub host: Ipv4Addr,
    pub port: u16,
}

impl DeviceEndpoint {
    pub fn new(host: Ipv4Addr, port: u16) -> Self {
        Self { host, port }
    }

    /// Endpoint on the default port.
    pub fn on_default_port(host: Ipv4Addr) -> Self {
        Self::new(host, DEFAULT_PORT)
    }

    /// Build an endpoint from user-entered strings. An empty port means
    /// [`DEFAULT_PORT`].
    pub fn parse(host: &str, port: &str) -> Result<Self, CoreError> {
        let host = host.trim();
        let host = host.parse::<Ipv4Addr>().map_err(|_| {
            CoreError::validation(format!("'{host}' is not a dotted-quad IPv4 address"))
        })?;

        let port = port.trim();
        let port = if port.is_empty() {
            DEFAULT_PORT
        } else {
            port.parse::<u16>()
                .ok()
                .filter(|p| *p != 0)
                .ok_or_else(|| CoreError::validation(format!("invalid port '{port}'")))?
        };

        Ok(Self { host, port })
    }

    /// `http://{host}:{port}`
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl fmt::Display for DeviceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Parses `host` or `host:port`.
impl FromStr for DeviceEndpoint {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once(':') {
            Some((host, port)) => Self::parse(host, port),
            None => Self::parse(s, ""),
        }
    }
}
