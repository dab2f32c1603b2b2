// Protection settings endpoints
//
// Every field is optional on the wire: firmware versions differ in which
// limits they report, and an absent field must stay distinguishable from
// an explicit zero.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::DeviceClient;
use crate::error::Error;

/// Threshold settings as reported by (or pushed to) the device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_voltage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_voltage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_current: Option<f64>,
    /// Over-current protection switch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protection_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_frequency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_frequency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_protection: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_power_factor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_factor_protection: Option<bool>,
}

impl DeviceClient {
    /// Fetch protection thresholds.
    ///
    /// `GET /api/settings`
    pub async fn get_settings(&self) -> Result<WireSettings, Error> {
        let url = self.api_url("settings")?;
        debug!("fetching settings");
        self.get(url).await
    }

    /// Push protection thresholds. Absent fields are left untouched on
    /// the device.
    ///
    /// `POST /api/settings`
    pub async fn update_settings(&self, settings: &WireSettings) -> Result<(), Error> {
        let url = self.api_url("settings")?;
        debug!(?settings, "updating settings");
        self.post_ack(url, settings).await
    }
}

#[cfg(test)]
mod tests {
    use super::WireSettings;

    #[test]
    fn absent_fields_stay_none() {
        let s: WireSettings =
            serde_json::from_str(r#"{"maxVoltage":245,"protectionEnabled":false}"#)
                .expect("valid settings");
        assert_eq!(s.max_voltage, Some(245.0));
        assert_eq!(s.protection_enabled, Some(false));
        assert!(s.min_voltage.is_none());
        assert!(s.min_power_factor.is_none());
    }

    #[test]
    fn serialization_omits_absent_fields() {
        let s = WireSettings {
            max_current: Some(20.0),
            ..WireSettings::default()
        };
        let json = serde_json::to_string(&s).expect("serializes");
        assert_eq!(json, r#"{"maxCurrent":20.0}"#);
    }
}
