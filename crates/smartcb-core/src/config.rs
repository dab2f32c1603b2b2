// ── Runtime engine configuration ──
//
// These types describe *how* to discover and talk to a breaker. They
// never touch disk: the CLI builds a `ManagerConfig` from its TOML
// profile and hands it in.

use std::time::Duration;

/// Upper bound on simultaneous discovery probes.
pub const MAX_SCAN_CONCURRENCY: usize = 64;

/// Discovery tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Deadline for one probe.
    pub probe_timeout: Duration,
    /// Probes in flight at once, clamped to `1..=MAX_SCAN_CONCURRENCY`.
    pub concurrency: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(1),
            concurrency: 24,
        }
    }
}

impl ScanOptions {
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.clamp(1, MAX_SCAN_CONCURRENCY)
    }
}

/// Configuration for a [`DeviceManager`](crate::DeviceManager).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Request timeout for the handshake and every sync call.
    pub timeout: Duration,
    /// Discovery tuning.
    pub scan: ScanOptions,
    /// Push the wall clock to the device after each successful connect.
    pub sync_clock: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            scan: ScanOptions::default(),
            sync_clock: true,
        }
    }
}
