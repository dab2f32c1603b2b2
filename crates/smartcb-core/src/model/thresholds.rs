// ── Protection thresholds ──
//
// Local view of the breaker's protection limits. Factory defaults mirror
// the firmware's, so a device that omits a field and a fresh install
// agree on the effective value.

use serde::{Deserialize, Serialize};

use smartcb_api::WireSettings;

use crate::error::CoreError;

/// Over/under-voltage limits.
///
/// `min`/`max` are the trip limits; `normal_min`/`normal_max` is the
/// comfortable band inside them. Voltage protection cannot be disabled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoltageLimits {
    pub min: f64,
    pub max: f64,
    pub normal_min: f64,
    pub normal_max: f64,
}

impl Default for VoltageLimits {
    fn default() -> Self {
        Self {
            min: 180.0,
            max: 250.0,
            normal_min: 210.0,
            normal_max: 230.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrentLimit {
    pub max: f64,
    pub enabled: bool,
}

impl Default for CurrentLimit {
    fn default() -> Self {
        Self {
            max: 16.0,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrequencyLimits {
    pub min: f64,
    pub max: f64,
    pub enabled: bool,
}

impl Default for FrequencyLimits {
    fn default() -> Self {
        Self {
            min: 49.0,
            max: 51.0,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerFactorLimit {
    pub min: f64,
    pub enabled: bool,
}

impl Default for PowerFactorLimit {
    fn default() -> Self {
        Self {
            min: 0.85,
            enabled: true,
        }
    }
}

/// Energy budget in kWh. Tracked locally only; the firmware has no field for it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyLimit {
    pub max: f64,
    pub enabled: bool,
}

impl Default for EnergyLimit {
    fn default() -> Self {
        Self {
            max: 10.0,
            enabled: false,
        }
    }
}

/// Complete protection configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub voltage: VoltageLimits,
    pub current: CurrentLimit,
    pub frequency: FrequencyLimits,
    pub power_factor: PowerFactorLimit,
    pub energy: EnergyLimit,
}

impl Thresholds {
    /// Check `min <= max` on every bounded dimension and that no limit
    /// is NaN or negative.
    pub fn validate(&self) -> Result<(), CoreError> {
        let values = [
            ("voltage.min", self.voltage.min),
            ("voltage.max", self.voltage.max),
            ("voltage.normal_min", self.voltage.normal_min),
            ("voltage.normal_max", self.voltage.normal_max),
            ("current.max", self.current.max),
            ("frequency.min", self.frequency.min),
            ("frequency.max", self.frequency.max),
            ("power_factor.min", self.power_factor.min),
            ("energy.max", self.energy.max),
        ];
        for (name, value) in values {
            if !value.is_finite() || value < 0.0 {
                return Err(CoreError::validation(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }

        ordered("voltage", self.voltage.min, self.voltage.max)?;
        ordered(
            "voltage normal band",
            self.voltage.normal_min,
            self.voltage.normal_max,
        )?;
        ordered("frequency", self.frequency.min, self.frequency.max)?;

        if self.power_factor.min > 1.0 {
            return Err(CoreError::validation(format!(
                "power_factor.min must be <= 1.0, got {}",
                self.power_factor.min
            )));
        }
        Ok(())
    }

    /// The subset of this configuration the firmware understands.
    pub fn to_wire(&self) -> WireSettings {
        WireSettings {
            min_voltage: Some(self.voltage.min),
            max_voltage: Some(self.voltage.max),
            max_current: Some(self.current.max),
            protection_enabled: Some(self.current.enabled),
            min_frequency: Some(self.frequency.min),
            max_frequency: Some(self.frequency.max),
            frequency_protection: Some(self.frequency.enabled),
            min_power_factor: Some(self.power_factor.min),
            power_factor_protection: Some(self.power_factor.enabled),
        }
    }
}

fn ordered(name: &str, min: f64, max: f64) -> Result<(), CoreError> {
    if min > max {
        return Err(CoreError::validation(format!(
            "{name} min ({min}) must not exceed max ({max})"
        )));
    }
    Ok(())
}
