//! Discovery, connection, and configuration sync for SmartCB breakers.
//!
//! This crate sits between `smartcb-api` and user-facing consumers:
//!
//! - **[`DeviceManager`]**: single writer of [`ConnectionState`].
//!   [`scan()`](DeviceManager::scan) sweeps a [`CandidateSet`] without
//!   connecting; [`connect()`](DeviceManager::connect) runs the handshake,
//!   pulls settings and schedules, and pushes the clock, returning a
//!   [`SyncReport`] that records any step that failed.
//!
//! - **[`ConfigStore`]**: lock-free snapshots of the reconciled
//!   [`Thresholds`] and [`Schedule`] list with a `watch` version counter.
//!
//! - **Protection** ([`protection`]): the pure [`classify`] evaluator and
//!   the [`ReadingMonitor`], which turns a reading stream into breach
//!   transitions.
//!
//! - **Domain model** ([`model`]): endpoints, thresholds, schedules, and
//!   readings, converted from wire types at the sync boundary.

pub mod config;
pub mod discovery;
pub mod error;
pub mod manager;
pub mod model;
pub mod protection;
pub mod store;
pub mod sync;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{MAX_SCAN_CONCURRENCY, ManagerConfig, ScanOptions};
pub use discovery::{CandidateSet, DiscoveredDevice, ScanResult};
pub use error::CoreError;
pub use manager::{ConnectionState, DeviceManager, SyncReport, SyncSession};
pub use protection::{
    Assessment, BreachEvent, BreachKind, BreachTracker, Level, ReadingMonitor, classify,
};
pub use store::ConfigStore;
pub use sync::{StepOutcome, SyncPull, WallClock};

pub use model::{
    ClockTime, CurrentLimit, DEFAULT_PORT, DeviceEndpoint, EnergyLimit, FrequencyLimits,
    PowerFactorLimit, Reading, Schedule, ScheduleId, StatusFlags, Thresholds, VoltageLimits,
};

pub use smartcb_api::{DeviceInfo, ProbeOutcome};
