// ── Electrical readings ──

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use smartcb_api::WireReading;

/// Device-reported status flags. `None` means the firmware did not report
/// the flag at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusFlags {
    pub protection_triggered: Option<bool>,
    pub manual_override: Option<bool>,
    pub outage: Option<bool>,
    pub reconnection_pending: Option<bool>,
}

impl StatusFlags {
    /// Any flag explicitly reported as set.
    pub fn any_set(&self) -> bool {
        [
            self.protection_triggered,
            self.manual_override,
            self.outage,
            self.reconnection_pending,
        ]
        .into_iter()
        .any(|f| f == Some(true))
    }
}

/// One timestamped sample. Produced by the device or an external
/// generator; never mutated by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub voltage: f64,
    pub current: f64,
    pub power: f64,
    /// Accumulated energy, kWh.
    pub energy: f64,
    pub frequency: f64,
    pub power_factor: f64,
    pub apparent_power: f64,
    pub relay_on: bool,
    pub flags: StatusFlags,
}

impl Reading {
    /// Convert a device sample. Missing timestamps (no NTP on the device)
    /// take `received_at`; missing apparent power is derived as V·I.
    pub fn from_wire(wire: WireReading, received_at: DateTime<Utc>) -> Self {
        let timestamp = wire
            .timestamp
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .unwrap_or(received_at);

        Self {
            timestamp,
            voltage: wire.voltage,
            current: wire.current,
            power: wire.power,
            energy: wire.energy,
            frequency: wire.frequency,
            power_factor: wire.power_factor,
            apparent_power: wire
                .apparent_power
                .unwrap_or(wire.voltage * wire.current),
            relay_on: wire.relay_state,
            flags: StatusFlags {
                protection_triggered: wire.protection_triggered,
                manual_override: wire.manual_override,
                outage: wire.outage,
                reconnection_pending: wire.reconnection_pending,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire() -> WireReading {
        WireReading {
            voltage: 230.0,
            current: 2.0,
            power: 440.0,
            energy: 0.5,
            frequency: 50.0,
            power_factor: 0.95,
            apparent_power: None,
            relay_state: true,
            timestamp: None,
            protection_triggered: None,
            manual_override: Some(true),
            outage: None,
            reconnection_pending: None,
        }
    }

    #[test]
    fn missing_timestamp_and_apparent_power_are_filled() {
        let received = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().expect("valid");
        let r = Reading::from_wire(wire(), received);
        assert_eq!(r.timestamp, received);
        assert!((r.apparent_power - 460.0).abs() < 1e-9);
        assert!(r.flags.any_set());
    }

    #[test]
    fn device_timestamp_wins() {
        let mut w = wire();
        w.timestamp = Some(1_700_000_000_000);
        w.manual_override = None;
        let r = Reading::from_wire(w, Utc::now());
        assert_eq!(r.timestamp.timestamp(), 1_700_000_000);
        assert!(!r.flags.any_set());
    }
}
