//! Schedules command handlers.

use tabled::Tabled;

use smartcb_core::Schedule;

use super::{Context, util};
use crate::cli::{GlobalOpts, SchedulesArgs, SchedulesCommand};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct ScheduleRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "On")]
    on: String,
    #[tabled(rename = "Off")]
    off: String,
    #[tabled(rename = "Days")]
    days: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
}

impl From<&Schedule> for ScheduleRow {
    fn from(s: &Schedule) -> Self {
        Self {
            id: s.id.to_string(),
            on: s.on_time.to_string(),
            off: s.off_time.to_string(),
            days: s.day_names(),
            enabled: if s.enabled { "yes" } else { "no" }.into(),
        }
    }
}

pub async fn handle(
    ctx: &Context,
    args: SchedulesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    util::connect(ctx, global).await?;

    match args.command {
        SchedulesCommand::List => {
            let schedules = ctx.manager.store().schedules();
            let out = output::render_list(
                &output::format(global),
                schedules.as_slice(),
                |s| ScheduleRow::from(s),
                |s| s.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
