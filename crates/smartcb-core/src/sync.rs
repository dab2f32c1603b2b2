// ── Configuration and clock synchronization ──
//
// Runs after a successful handshake. Settings and schedules are pulled
// one after the other and reconciled into the `ConfigStore`; the clock is
// then pushed once. A failing step is recorded, never propagated, so the
// connection still completes.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Local, TimeZone, Timelike};
use serde::Serialize;
use tracing::{debug, info, warn};

use smartcb_api::{DeviceClient, TimeSet, WireSchedule, WireSettings};

use crate::error::CoreError;
use crate::model::{Schedule, ScheduleId, Thresholds};
use crate::store::ConfigStore;

// ── Step outcomes ────────────────────────────────────────────────────

/// Result of one sync step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    Synced,
    Failed { reason: String },
    Skipped,
}

impl StepOutcome {
    pub fn failed(err: &impl std::fmt::Display) -> Self {
        Self::Failed {
            reason: err.to_string(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Failed { reason } => Some(reason),
            Self::Synced | Self::Skipped => None,
        }
    }
}

impl std::fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Synced => f.write_str("synced"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
            Self::Skipped => f.write_str("skipped"),
        }
    }
}

/// Outcome of a configuration pull.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncPull {
    pub settings: StepOutcome,
    pub schedules: StepOutcome,
}

// ── Reconciliation ───────────────────────────────────────────────────

/// Overlay the fields the device reported onto `local`.
///
/// Absent fields keep the local value. Voltage protection has no switch
/// on the firmware; `protectionEnabled` gates over-current only.
pub fn reconcile_thresholds(local: &Thresholds, wire: &WireSettings) -> Thresholds {
    let mut t = *local;
    overlay(&mut t.voltage.min, wire.min_voltage);
    overlay(&mut t.voltage.max, wire.max_voltage);
    overlay(&mut t.current.max, wire.max_current);
    overlay(&mut t.current.enabled, wire.protection_enabled);
    overlay(&mut t.frequency.min, wire.min_frequency);
    overlay(&mut t.frequency.max, wire.max_frequency);
    overlay(&mut t.frequency.enabled, wire.frequency_protection);
    overlay(&mut t.power_factor.min, wire.min_power_factor);
    overlay(&mut t.power_factor.enabled, wire.power_factor_protection);
    t
}

fn overlay<T>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

/// Convert the device's schedule list. One bad entry, or an id the device
/// repeats, rejects the list.
///
/// Entries without an id get `sched-{index}`, suffixed until it clashes
/// with no other id in the list.
pub fn reconcile_schedules(wire: Vec<WireSchedule>) -> Result<Vec<Schedule>, CoreError> {
    let mut taken = BTreeSet::new();
    for id in wire.iter().filter_map(|entry| entry.id.as_ref()) {
        if !taken.insert(ScheduleId::new(id.to_string())) {
            return Err(CoreError::validation(format!(
                "device reported schedule id {id} more than once"
            )));
        }
    }

    wire.into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let device_id = entry.id.is_some();
            let mut schedule = Schedule::from_wire(entry, index)?;
            if !device_id {
                let mut suffix = 0;
                while taken.contains(&schedule.id) {
                    suffix += 1;
                    schedule.id = ScheduleId::new(format!("sched-{index}-{suffix}"));
                }
                taken.insert(schedule.id.clone());
            }
            Ok(schedule)
        })
        .collect()
}

/// Pull settings then schedules into `store`.
pub async fn pull_configuration(client: &DeviceClient, store: &ConfigStore) -> SyncPull {
    let settings = pull_settings(client, store).await;
    let schedules = pull_schedules(client, store).await;
    SyncPull {
        settings,
        schedules,
    }
}

async fn pull_settings(client: &DeviceClient, store: &ConfigStore) -> StepOutcome {
    let wire = match client.get_settings().await {
        Ok(wire) => wire,
        Err(e) => {
            let e = CoreError::from(e);
            warn!(error = %e, "settings pull failed, keeping local thresholds");
            return StepOutcome::failed(&e);
        }
    };

    let reconciled = reconcile_thresholds(&store.thresholds(), &wire);
    if let Err(e) = reconciled.validate() {
        warn!(error = %e, "device thresholds are inconsistent, keeping local thresholds");
        return StepOutcome::failed(&e);
    }

    store.set_thresholds(reconciled);
    debug!(?reconciled, "thresholds reconciled");
    StepOutcome::Synced
}

async fn pull_schedules(client: &DeviceClient, store: &ConfigStore) -> StepOutcome {
    let wire = match client.get_schedules().await {
        Ok(wire) => wire,
        Err(e) => {
            let e = CoreError::from(e);
            warn!(error = %e, "schedule pull failed, keeping local schedules");
            return StepOutcome::failed(&e);
        }
    };

    match reconcile_schedules(wire) {
        Ok(schedules) => {
            debug!(count = schedules.len(), "schedules replaced");
            store.replace_schedules(schedules);
            StepOutcome::Synced
        }
        Err(e) => {
            warn!(error = %e, "device sent a malformed schedule, keeping local schedules");
            StepOutcome::failed(&e)
        }
    }
}

// ── Clock ────────────────────────────────────────────────────────────

/// Local wall-clock time as the device understands it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WallClock {
    pub hour: u8,
    pub minute: u8,
    /// 0 = Sunday ... 6 = Saturday.
    pub weekday: u8,
}

impl WallClock {
    pub fn now() -> Self {
        Self::from_datetime(&Local::now())
    }

    pub fn from_datetime<Tz: TimeZone>(at: &DateTime<Tz>) -> Self {
        // chrono guarantees hour < 24, minute < 60, weekday < 7.
        Self {
            hour: u8::try_from(at.hour()).unwrap_or_default(),
            minute: u8::try_from(at.minute()).unwrap_or_default(),
            weekday: u8::try_from(at.weekday().num_days_from_sunday()).unwrap_or_default(),
        }
    }
}

impl From<WallClock> for TimeSet {
    fn from(c: WallClock) -> Self {
        TimeSet {
            hour: c.hour,
            minute: c.minute,
            day: c.weekday,
        }
    }
}

/// Push `clock` to the device once.
pub async fn push_clock(client: &DeviceClient, clock: WallClock) -> StepOutcome {
    match client.set_time(clock.into()).await {
        Ok(()) => {
            info!(
                hour = clock.hour,
                minute = clock.minute,
                weekday = clock.weekday,
                "device clock set"
            );
            StepOutcome::Synced
        }
        Err(e) => {
            let e = CoreError::from(e);
            warn!(error = %e, "clock push failed");
            StepOutcome::failed(&e)
        }
    }
}
