// ── Domain model ──
//
// Canonical types shared by discovery, sync, and protection. Wire types
// from `smartcb-api` are converted into these at the sync boundary.

pub mod endpoint;
pub mod reading;
pub mod schedule;
pub mod thresholds;

pub use endpoint::{DEFAULT_PORT, DeviceEndpoint};
pub use reading::{Reading, StatusFlags};
pub use schedule::{ClockTime, Schedule, ScheduleId};
pub use thresholds::{
    CurrentLimit, EnergyLimit, FrequencyLimits, PowerFactorLimit, Thresholds, VoltageLimits,
};
