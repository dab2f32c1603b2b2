//! Time command handlers.

use super::{Context, connect, util};
use crate::cli::{GlobalOpts, TimeArgs, TimeCommand};
use crate::error::CliError;
use crate::output;

pub async fn handle(ctx: &Context, args: TimeArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        TimeCommand::Sync => {
            // The clock push runs as part of connect; force it on even
            // when `defaults.sync_clock` is off.
            let manager = ctx.manager_with(|config| config.sync_clock = true);
            let report = util::connect_with(ctx, &manager, global).await?;
            if let Some(reason) = report.clock.reason() {
                return Err(CliError::SyncFailed {
                    step: "clock".into(),
                    reason: reason.to_owned(),
                });
            }
            let out = output::render_single(
                &output::format(global),
                &report,
                connect::detail,
                |r| r.clock.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
