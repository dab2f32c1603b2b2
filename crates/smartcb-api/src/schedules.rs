// Schedule endpoint
//
// Firmware answers either with a bare array or with `{"schedules": [...]}`;
// both shapes decode into the same list. Validation of times and weekday
// indices happens in `smartcb-core`, not here.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::DeviceClient;
use crate::error::Error;

/// One schedule entry as stored on the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSchedule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<WireScheduleId>,
    pub on_time: String,
    pub off_time: String,
    #[serde(default)]
    pub days: Vec<u8>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// Ids come back as numbers from some builds and strings from others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireScheduleId {
    Number(u64),
    Text(String),
}

impl std::fmt::Display for WireScheduleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

fn default_enabled() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ScheduleList {
    Bare(Vec<WireSchedule>),
    Wrapped { schedules: Vec<WireSchedule> },
}

impl From<ScheduleList> for Vec<WireSchedule> {
    fn from(list: ScheduleList) -> Self {
        match list {
            ScheduleList::Bare(items) | ScheduleList::Wrapped { schedules: items } => items,
        }
    }
}

impl DeviceClient {
    /// List on/off schedules stored on the device.
    ///
    /// `GET /api/schedules`
    pub async fn get_schedules(&self) -> Result<Vec<WireSchedule>, Error> {
        let url = self.api_url("schedules")?;
        debug!("fetching schedules");
        let list: ScheduleList = self.get(url).await?;
        Ok(list.into())
    }
}
