//! Status command handler.

use std::fmt::Write as _;

use serde::Serialize;

use smartcb_core::{Assessment, Level, Reading, classify};

use super::{Context, util};
use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

/// A reading together with its classification.
#[derive(Debug, Serialize)]
pub struct StatusView {
    pub reading: Reading,
    pub assessment: Assessment,
    pub level: Level,
}

impl StatusView {
    pub fn new(reading: Reading, assessment: Assessment) -> Self {
        Self {
            level: assessment.worst(),
            reading,
            assessment,
        }
    }
}

pub fn detail(view: &StatusView, color: bool) -> String {
    let r = &view.reading;
    let a = &view.assessment;
    let paint = |level| output::paint_level(level, color);

    let mut out = String::new();
    let _ = writeln!(out, "Time:          {}", r.timestamp.format("%Y-%m-%d %H:%M:%S UTC"));
    let _ = writeln!(out, "Relay:         {}", if r.relay_on { "on" } else { "off" });
    let _ = writeln!(out, "Voltage:       {:.1} V  [{}]", r.voltage, paint(a.voltage));
    let _ = writeln!(out, "Current:       {:.2} A  [{}]", r.current, paint(a.current));
    let _ = writeln!(out, "Frequency:     {:.2} Hz  [{}]", r.frequency, paint(a.frequency));
    let _ = writeln!(out, "Power factor:  {:.2}  [{}]", r.power_factor, paint(a.power_factor));
    let _ = writeln!(out, "Power:         {:.1} W ({:.1} VA)", r.power, r.apparent_power);
    let _ = writeln!(out, "Energy:        {:.3} kWh", r.energy);
    if r.flags.any_set() {
        let _ = writeln!(out, "Flags:         {}", flag_names(r).join(", "));
    }
    let _ = write!(out, "Overall:       {}", paint(view.level));
    out
}

fn flag_names(r: &Reading) -> Vec<&'static str> {
    [
        ("protection-triggered", r.flags.protection_triggered),
        ("manual-override", r.flags.manual_override),
        ("outage", r.flags.outage),
        ("reconnection-pending", r.flags.reconnection_pending),
    ]
    .into_iter()
    .filter(|(_, set)| *set == Some(true))
    .map(|(name, _)| name)
    .collect()
}

pub async fn handle(ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    util::connect(ctx, global).await?;
    let reading = ctx.manager.read_current().await?;
    let assessment = classify(&reading, &ctx.manager.store().thresholds());
    let view = StatusView::new(reading, assessment);

    let color = output::should_color(&global.color);
    let out = output::render_single(
        &output::format(global),
        &view,
        |v| detail(v, color),
        |v| v.level.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
