// ── On/off schedules ──

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use smartcb_api::WireSchedule;

use crate::error::CoreError;

/// A 24-hour wall-clock time, serialized as `"HH:MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime {
    hour: u8,
    minute: u8,
}

impl ClockTime {
    pub fn new(hour: u8, minute: u8) -> Result<Self, CoreError> {
        if hour > 23 || minute > 59 {
            return Err(CoreError::validation(format!(
                "{hour:02}:{minute:02} is not a valid 24-hour time"
            )));
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(self) -> u8 {
        self.hour
    }

    pub fn minute(self) -> u8 {
        self.minute
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for ClockTime {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::validation(format!("'{s}' is not an HH:MM time"));
        let (h, m) = s.split_once(':').ok_or_else(invalid)?;
        if h.len() != 2 || m.len() != 2 {
            return Err(invalid());
        }
        let hour = h.parse::<u8>().map_err(|_| invalid())?;
        let minute = m.parse::<u8>().map_err(|_| invalid())?;
        Self::new(hour, minute)
    }
}

impl TryFrom<String> for ClockTime {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ClockTime> for String {
    fn from(t: ClockTime) -> Self {
        t.to_string()
    }
}

/// Stable identifier for a schedule entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleId(String);

impl ScheduleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Local id for a device entry that carries none. Derived from the
    /// entry's position so repeated pulls of the same list agree.
    pub fn local(index: usize) -> Self {
        Self(format!("sched-{index}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScheduleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A recurring daily on/off program.
///
/// `days` holds weekday indices, 0 = Sunday through 6 = Saturday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: ScheduleId,
    pub on_time: ClockTime,
    pub off_time: ClockTime,
    pub days: BTreeSet<u8>,
    pub enabled: bool,
}

impl Schedule {
    pub fn new(
        id: ScheduleId,
        on_time: ClockTime,
        off_time: ClockTime,
        days: impl IntoIterator<Item = u8>,
        enabled: bool,
    ) -> Result<Self, CoreError> {
        let days: BTreeSet<u8> = days.into_iter().collect();
        if let Some(bad) = days.iter().find(|d| **d > 6) {
            return Err(CoreError::validation(format!(
                "schedule {id}: weekday index {bad} is out of range 0-6"
            )));
        }
        Ok(Self {
            id,
            on_time,
            off_time,
            days,
            enabled,
        })
    }

    /// Convert one device entry, assigning `sched-{index}` when the device
    /// sent no id. Rejects malformed times and weekday indices.
    pub fn from_wire(wire: WireSchedule, index: usize) -> Result<Self, CoreError> {
        let id = wire
            .id
            .map_or_else(|| ScheduleId::local(index), |id| ScheduleId::new(id.to_string()));
        let on_time = wire.on_time.parse()?;
        let off_time = wire.off_time.parse()?;
        Self::new(id, on_time, off_time, wire.days, wire.enabled)
    }

    /// Whether this program runs on the given weekday (0 = Sunday).
    pub fn runs_on(&self, weekday: u8) -> bool {
        self.enabled && self.days.contains(&weekday)
    }

    /// Comma-separated short day names, e.g. `"Mon,Wed,Fri"`.
    pub fn day_names(&self) -> String {
        const NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
        self.days
            .iter()
            .filter_map(|d| NAMES.get(usize::from(*d)).copied())
            .collect::<Vec<_>>()
            .join(",")
    }
}
