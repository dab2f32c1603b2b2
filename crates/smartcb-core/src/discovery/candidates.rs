// ── Candidate address generation ──
//
// The scanner only consumes a set; this module decides what goes in it:
// a handful of addresses the breaker commonly lands on, optionally
// extended with every host of the local subnet.

use std::collections::BTreeSet;
use std::net::{Ipv4Addr, SocketAddr};

use tokio::net::UdpSocket;
use tracing::{debug, trace};

use crate::error::CoreError;
use crate::model::DeviceEndpoint;

/// Addresses the device family is most often found at: the ESP32
/// soft-AP gateway during provisioning, then the static leases the
/// setup guide suggests on common home routers.
pub const COMMON_ADDRESSES: [Ipv4Addr; 7] = [
    Ipv4Addr::new(192, 168, 4, 1),
    Ipv4Addr::new(192, 168, 1, 100),
    Ipv4Addr::new(192, 168, 0, 100),
    Ipv4Addr::new(192, 168, 1, 177),
    Ipv4Addr::new(192, 168, 0, 177),
    Ipv4Addr::new(192, 168, 100, 100),
    Ipv4Addr::new(10, 0, 0, 100),
];

/// Narrowest and widest prefix accepted for subnet sweeps.
const MIN_SUBNET_PREFIX: u8 = 20;
const MAX_SUBNET_PREFIX: u8 = 30;

/// Ordered, duplicate-free set of endpoints to probe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    endpoints: BTreeSet<DeviceEndpoint>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The fixed list of historically common addresses on `port`.
    pub fn common(port: u16) -> Self {
        COMMON_ADDRESSES
            .iter()
            .map(|host| DeviceEndpoint::new(*host, port))
            .collect()
    }

    pub fn insert(&mut self, endpoint: DeviceEndpoint) -> bool {
        self.endpoints.insert(endpoint)
    }

    /// Add every usable host of `host/prefix` on `port`, skipping the
    /// network, broadcast, and `host` itself. Returns how many were new.
    pub fn extend_subnet(
        &mut self,
        host: Ipv4Addr,
        prefix: u8,
        port: u16,
    ) -> Result<usize, CoreError> {
        let before = self.endpoints.len();
        for addr in subnet_hosts(host, prefix)? {
            self.endpoints.insert(DeviceEndpoint::new(addr, port));
        }
        let added = self.endpoints.len() - before;
        debug!(%host, prefix, added, "extended candidates with subnet");
        Ok(added)
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceEndpoint> {
        self.endpoints.iter()
    }

    pub fn contains(&self, endpoint: &DeviceEndpoint) -> bool {
        self.endpoints.contains(endpoint)
    }
}

impl FromIterator<DeviceEndpoint> for CandidateSet {
    fn from_iter<I: IntoIterator<Item = DeviceEndpoint>>(iter: I) -> Self {
        Self {
            endpoints: iter.into_iter().collect(),
        }
    }
}

impl Extend<DeviceEndpoint> for CandidateSet {
    fn extend<I: IntoIterator<Item = DeviceEndpoint>>(&mut self, iter: I) {
        self.endpoints.extend(iter);
    }
}

/// Usable host addresses of `host/prefix`, excluding `host`.
pub fn subnet_hosts(host: Ipv4Addr, prefix: u8) -> Result<Vec<Ipv4Addr>, CoreError> {
    if !(MIN_SUBNET_PREFIX..=MAX_SUBNET_PREFIX).contains(&prefix) {
        return Err(CoreError::validation(format!(
            "subnet prefix must be between /{MIN_SUBNET_PREFIX} and /{MAX_SUBNET_PREFIX}, got /{prefix}"
        )));
    }

    let mask = u32::MAX << (32 - u32::from(prefix));
    let own = u32::from(host);
    let network = own & mask;
    let broadcast = network | !mask;

    Ok(((network + 1)..broadcast)
        .filter(|addr| *addr != own)
        .map(Ipv4Addr::from)
        .collect())
}

/// Parse `a.b.c.d/nn`.
pub fn parse_ipv4_cidr(cidr: &str) -> Result<(Ipv4Addr, u8), CoreError> {
    let (host, prefix) = cidr
        .split_once('/')
        .ok_or_else(|| CoreError::ValidationFailed {
            message: format!("invalid ipv4 host/prefix value '{cidr}'"),
        })?;
    let host_ip = host
        .parse::<Ipv4Addr>()
        .map_err(|_| CoreError::ValidationFailed {
            message: format!("invalid IPv4 host address '{host}'"),
        })?;
    let prefix_len = prefix
        .parse::<u8>()
        .map_err(|_| CoreError::ValidationFailed {
            message: format!("invalid IPv4 prefix length '{prefix}'"),
        })?;
    if prefix_len > 32 {
        return Err(CoreError::ValidationFailed {
            message: format!("IPv4 prefix length must be <= 32, got {prefix_len}"),
        });
    }
    Ok((host_ip, prefix_len))
}

/// Best-effort detection of this machine's LAN address.
///
/// Connecting a UDP socket selects the outbound interface without sending
/// anything. Returns `None` when offline or when the route is not IPv4.
pub async fn detect_local_ipv4() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)))
        .await
        .ok()?;
    // TEST-NET-1 address; no packet leaves the host.
    socket
        .connect(SocketAddr::from((Ipv4Addr::new(192, 0, 2, 1), 80)))
        .await
        .ok()?;
    match socket.local_addr().ok()? {
        SocketAddr::V4(addr) if !addr.ip().is_unspecified() && !addr.ip().is_loopback() => {
            trace!(ip = %addr.ip(), "detected local address");
            Some(*addr.ip())
        }
        _ => None,
    }
}
