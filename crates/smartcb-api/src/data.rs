// Live data and relay endpoints

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::client::DeviceClient;
use crate::error::Error;

/// Body of `GET /api/data`: one electrical sample plus relay and status flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireReading {
    pub voltage: f64,
    pub current: f64,
    pub power: f64,
    pub energy: f64,
    pub frequency: f64,
    #[serde(alias = "pf")]
    pub power_factor: f64,
    #[serde(default)]
    pub apparent_power: Option<f64>,
    #[serde(alias = "relay")]
    pub relay_state: bool,
    /// Milliseconds since the Unix epoch, when the firmware has NTP.
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub protection_triggered: Option<bool>,
    #[serde(default)]
    pub manual_override: Option<bool>,
    #[serde(default, alias = "powerOutage")]
    pub outage: Option<bool>,
    #[serde(default)]
    pub reconnection_pending: Option<bool>,
}

impl DeviceClient {
    /// Fetch the latest electrical reading.
    ///
    /// `GET /api/data`
    pub async fn get_reading(&self) -> Result<WireReading, Error> {
        let url = self.api_url("data")?;
        debug!("fetching reading");
        self.get(url).await
    }

    /// Switch the breaker relay.
    ///
    /// `POST /api/relay` with `{"state": bool}`
    pub async fn set_relay(&self, on: bool) -> Result<(), Error> {
        let url = self.api_url("relay")?;
        debug!(on, "switching relay");
        self.post_ack(url, &json!({ "state": on })).await
    }
}
