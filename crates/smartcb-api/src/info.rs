// Identification endpoint
//
// `GET /api/info` is both the discovery probe and the connect handshake.
// A device is "present" only when it answers with a model string from
// the SmartCB family.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::client::DeviceClient;
use crate::error::Error;

/// Model prefix shared by every firmware build of the breaker.
pub const DEVICE_FAMILY: &str = "SmartCB";

/// Body of `GET /api/info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub model: String,
    #[serde(default, alias = "version")]
    pub firmware: Option<String>,
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default, alias = "deviceName")]
    pub name: Option<String>,
}

impl DeviceInfo {
    pub fn is_supported(&self) -> bool {
        is_supported_model(&self.model)
    }
}

/// `true` when `model` belongs to the SmartCB device family.
pub fn is_supported_model(model: &str) -> bool {
    model
        .trim()
        .get(..DEVICE_FAMILY.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(DEVICE_FAMILY))
}

/// Result of a single discovery probe. Absence is not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub present: bool,
    pub model: Option<String>,
}

impl ProbeOutcome {
    pub fn absent() -> Self {
        Self::default()
    }

    fn found(model: String) -> Self {
        Self {
            present: true,
            model: Some(model),
        }
    }
}

impl DeviceClient {
    /// Fetch the device identification record.
    ///
    /// `GET /api/info`
    pub async fn get_info(&self) -> Result<DeviceInfo, Error> {
        let url = self.api_url("info")?;
        debug!("fetching device info");
        self.get(url).await
    }

    /// Check whether a SmartCB device answers at this address.
    ///
    /// The deadline is enforced here as well as in the HTTP client, so a
    /// peer that accepts the socket and never replies still resolves in
    /// time. Every failure mode collapses into [`ProbeOutcome::absent`].
    pub async fn probe(&self, deadline: Duration) -> ProbeOutcome {
        match tokio::time::timeout(deadline, self.get_info()).await {
            Ok(Ok(info)) if info.is_supported() => {
                debug!(url = %self.base_url(), model = %info.model, "device found");
                ProbeOutcome::found(info.model)
            }
            Ok(Ok(info)) => {
                trace!(url = %self.base_url(), model = %info.model, "foreign device ignored");
                ProbeOutcome::absent()
            }
            Ok(Err(e)) => {
                trace!(url = %self.base_url(), error = %e, "probe failed");
                ProbeOutcome::absent()
            }
            Err(_) => {
                trace!(url = %self.base_url(), "probe deadline elapsed");
                ProbeOutcome::absent()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_match_is_prefix_and_case_insensitive() {
        assert!(is_supported_model("SmartCB-ESP32"));
        assert!(is_supported_model("smartcb-esp32-v2"));
        assert!(is_supported_model("  SmartCB"));
        assert!(!is_supported_model("Shelly-1PM"));
        assert!(!is_supported_model("Smart"));
        assert!(!is_supported_model(""));
    }

    #[test]
    fn info_accepts_version_alias() {
        let info: DeviceInfo =
            serde_json::from_str(r#"{"model":"SmartCB-ESP32","version":"1.4.2"}"#)
                .expect("valid info");
        assert_eq!(info.firmware.as_deref(), Some("1.4.2"));
        assert!(info.is_supported());
    }

    #[test]
    fn info_without_model_is_malformed() {
        let parsed = serde_json::from_str::<DeviceInfo>(r#"{"firmware":"1.0"}"#);
        assert!(parsed.is_err());
    }
}
