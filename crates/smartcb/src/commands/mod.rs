//! Command dispatch: bridges CLI args -> `DeviceManager` -> output formatting.

pub mod config_cmd;
pub mod connect;
pub mod relay;
pub mod scan;
pub mod schedules;
pub mod status;
pub mod thresholds;
pub mod time;
pub mod util;
pub mod watch;

use smartcb_config::Config;
use smartcb_core::{DeviceEndpoint, DeviceManager, ManagerConfig};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Everything a device-bound command needs.
pub struct Context {
    pub manager: DeviceManager,
    /// Resolved from flags or profile; `None` falls back to a scan.
    pub endpoint: Option<DeviceEndpoint>,
    pub config: Config,
}

impl Context {
    /// A fresh manager sharing this context's store, with `adjust` applied
    /// to a copy of its configuration.
    pub fn manager_with(&self, adjust: impl FnOnce(&mut ManagerConfig)) -> DeviceManager {
        let mut config = self.manager.config().clone();
        adjust(&mut config);
        DeviceManager::new(config, self.manager.store().clone())
    }
}

/// Dispatch a device-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Scan(args) => scan::handle(ctx, args, global).await,
        Command::Connect(args) => connect::handle(ctx, args, global).await,
        Command::Status => status::handle(ctx, global).await,
        Command::Watch(args) => watch::handle(ctx, args, global).await,
        Command::Relay(args) => relay::handle(ctx, args, global).await,
        Command::Thresholds(args) => thresholds::handle(ctx, args, global).await,
        Command::Schedules(args) => schedules::handle(ctx, args, global).await,
        Command::Time(args) => time::handle(ctx, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "config and completions do not talk to a device".into(),
        )),
    }
}
