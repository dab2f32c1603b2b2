// Clock endpoint
//
// One-way push of wall-clock time so on-device schedules fire correctly.
// The device never reports its own clock back.

use serde::Serialize;
use tracing::debug;

use crate::client::DeviceClient;
use crate::error::Error;

/// Body of `POST /api/time`. `day` is 0 = Sunday ... 6 = Saturday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeSet {
    pub hour: u8,
    pub minute: u8,
    pub day: u8,
}

impl DeviceClient {
    /// Set the device clock.
    ///
    /// `POST /api/time` with `{"hour": H, "minute": M, "day": D}`
    pub async fn set_time(&self, time: TimeSet) -> Result<(), Error> {
        let url = self.api_url("time")?;
        debug!(hour = time.hour, minute = time.minute, day = time.day, "setting device time");
        self.post_ack(url, &time).await
    }
}
