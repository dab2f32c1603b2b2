// ── Threshold protection evaluator ──
//
// Pure classification of one reading against one threshold set. Each
// dimension is judged on its own; a disabled limit always reads Normal
// and so never raises the aggregate flag.

pub mod monitor;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::model::{Reading, Thresholds};

pub use monitor::{BreachEvent, BreachKind, BreachTracker, ReadingMonitor};

/// Fraction of the current ceiling below which current is comfortably
/// normal (15 A on a 16 A breaker).
pub const CURRENT_WARNING_RATIO: f64 = 0.9375;

/// Per-dimension status.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Level {
    #[default]
    Normal,
    Warning,
    Critical,
}

impl Level {
    pub fn is_normal(self) -> bool {
        self == Self::Normal
    }
}

/// Classification of a single reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    pub voltage: Level,
    pub current: Level,
    pub frequency: Level,
    pub power_factor: Level,
    pub needs_attention: bool,
}

impl Assessment {
    /// The most severe level across all dimensions.
    pub fn worst(&self) -> Level {
        [self.voltage, self.current, self.frequency, self.power_factor]
            .into_iter()
            .max()
            .unwrap_or_default()
    }

    /// Names of the dimensions that are not Normal.
    pub fn flagged(&self) -> Vec<&'static str> {
        [
            ("voltage", self.voltage),
            ("current", self.current),
            ("frequency", self.frequency),
            ("power_factor", self.power_factor),
        ]
        .into_iter()
        .filter(|(_, level)| !level.is_normal())
        .map(|(name, _)| name)
        .collect()
    }
}

/// Classify `reading` against `thresholds`.
pub fn classify(reading: &Reading, thresholds: &Thresholds) -> Assessment {
    let voltage = classify_voltage(reading.voltage, thresholds);
    let current = classify_current(reading.current, thresholds);
    let frequency = classify_frequency(reading.frequency, thresholds);
    let power_factor = classify_power_factor(reading.power_factor, thresholds);

    Assessment {
        voltage,
        current,
        frequency,
        power_factor,
        needs_attention: [voltage, current, frequency, power_factor]
            .iter()
            .any(|l| !l.is_normal()),
    }
}

fn classify_voltage(v: f64, t: &Thresholds) -> Level {
    let limits = &t.voltage;
    // The comfortable band never extends past the configured trip limits.
    let normal_min = limits.normal_min.max(limits.min);
    let normal_max = limits.normal_max.min(limits.max);

    if (normal_min..=normal_max).contains(&v) {
        Level::Normal
    } else if (limits.min..=limits.max).contains(&v) {
        Level::Warning
    } else {
        Level::Critical
    }
}

fn classify_current(i: f64, t: &Thresholds) -> Level {
    let limit = &t.current;
    if !limit.enabled {
        return Level::Normal;
    }
    if i < limit.max * CURRENT_WARNING_RATIO {
        Level::Normal
    } else if i <= limit.max {
        Level::Warning
    } else {
        Level::Critical
    }
}

fn classify_frequency(f: f64, t: &Thresholds) -> Level {
    let limits = &t.frequency;
    if !limits.enabled || (limits.min..=limits.max).contains(&f) {
        Level::Normal
    } else {
        Level::Warning
    }
}

fn classify_power_factor(pf: f64, t: &Thresholds) -> Level {
    let limit = &t.power_factor;
    if !limit.enabled || pf >= limit.min {
        Level::Normal
    } else {
        Level::Warning
    }
}
