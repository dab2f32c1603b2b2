// smartcb-api: Async Rust client for the SmartCB breaker HTTP API

pub mod client;
pub mod data;
pub mod error;
pub mod info;
pub mod schedules;
pub mod settings;
pub mod time;
pub mod transport;

pub use client::DeviceClient;
pub use data::WireReading;
pub use error::Error;
pub use info::{DEVICE_FAMILY, DeviceInfo, ProbeOutcome, is_supported_model};
pub use schedules::{WireSchedule, WireScheduleId};
pub use settings::WireSettings;
pub use time::TimeSet;
pub use transport::TransportConfig;
