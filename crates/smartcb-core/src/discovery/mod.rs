// ── Device discovery ──
//
// Candidate generation and the concurrent probe sweep. Nothing here
// touches connection state: `DeviceManager::scan` wraps `scan` with the
// state transitions.

pub mod candidates;
pub mod scanner;

pub use candidates::{
    COMMON_ADDRESSES, CandidateSet, detect_local_ipv4, parse_ipv4_cidr, subnet_hosts,
};
pub use scanner::{DiscoveredDevice, ScanResult, probe, scan};
