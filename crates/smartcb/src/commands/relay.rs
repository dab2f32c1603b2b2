//! Relay command handler.

use super::{Context, util};
use crate::cli::{GlobalOpts, RelayArgs, RelayState};
use crate::error::CliError;

pub async fn handle(ctx: &Context, args: RelayArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let report = util::connect(ctx, global).await?;
    let on = args.state == RelayState::On;
    ctx.manager.set_relay(on).await?;
    util::done(
        global,
        &format!("Relay at {} switched {}", report.endpoint, if on { "on" } else { "off" }),
    );
    Ok(())
}
