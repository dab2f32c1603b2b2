//! Thresholds command handlers.

use tabled::{Table, Tabled, settings::Style};

use smartcb_core::{CoreError, Thresholds};

use super::{Context, util};
use crate::cli::{GlobalOpts, ThresholdsArgs, ThresholdsCommand, ThresholdsSetArgs};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct LimitRow {
    #[tabled(rename = "Dimension")]
    dimension: &'static str,
    #[tabled(rename = "Limits")]
    limits: String,
    #[tabled(rename = "Enabled")]
    enabled: &'static str,
}

fn yes_no(b: bool) -> &'static str {
    if b { "yes" } else { "no" }
}

fn rows(t: &Thresholds) -> Vec<LimitRow> {
    vec![
        LimitRow {
            dimension: "voltage",
            limits: format!(
                "{:.1}-{:.1} V (normal {:.1}-{:.1})",
                t.voltage.min, t.voltage.max, t.voltage.normal_min, t.voltage.normal_max
            ),
            enabled: "always",
        },
        LimitRow {
            dimension: "current",
            limits: format!("max {:.2} A", t.current.max),
            enabled: yes_no(t.current.enabled),
        },
        LimitRow {
            dimension: "frequency",
            limits: format!("{:.2}-{:.2} Hz", t.frequency.min, t.frequency.max),
            enabled: yes_no(t.frequency.enabled),
        },
        LimitRow {
            dimension: "power factor",
            limits: format!("min {:.2}", t.power_factor.min),
            enabled: yes_no(t.power_factor.enabled),
        },
        LimitRow {
            dimension: "energy",
            limits: format!("max {:.2} kWh (local only)", t.energy.max),
            enabled: yes_no(t.energy.enabled),
        },
    ]
}

fn detail(t: &Thresholds) -> String {
    Table::new(rows(t)).with(Style::rounded()).to_string()
}

/// `key=value` lines for scripting.
fn plain(t: &Thresholds) -> String {
    [
        format!("voltage.min={}", t.voltage.min),
        format!("voltage.max={}", t.voltage.max),
        format!("voltage.normal_min={}", t.voltage.normal_min),
        format!("voltage.normal_max={}", t.voltage.normal_max),
        format!("current.max={}", t.current.max),
        format!("current.enabled={}", t.current.enabled),
        format!("frequency.min={}", t.frequency.min),
        format!("frequency.max={}", t.frequency.max),
        format!("frequency.enabled={}", t.frequency.enabled),
        format!("power_factor.min={}", t.power_factor.min),
        format!("power_factor.enabled={}", t.power_factor.enabled),
        format!("energy.max={}", t.energy.max),
        format!("energy.enabled={}", t.energy.enabled),
    ]
    .join("\n")
}

/// Overlay the flags that were given onto `current`.
fn apply(args: &ThresholdsSetArgs, current: &Thresholds) -> Thresholds {
    let mut t = *current;
    if let Some(v) = args.min_voltage {
        t.voltage.min = v;
    }
    if let Some(v) = args.max_voltage {
        t.voltage.max = v;
    }
    if let Some(v) = args.max_current {
        t.current.max = v;
    }
    if let Some(v) = args.current_protection {
        t.current.enabled = v;
    }
    if let Some(v) = args.min_frequency {
        t.frequency.min = v;
    }
    if let Some(v) = args.max_frequency {
        t.frequency.max = v;
    }
    if let Some(v) = args.frequency_protection {
        t.frequency.enabled = v;
    }
    if let Some(v) = args.min_power_factor {
        t.power_factor.min = v;
    }
    if let Some(v) = args.power_factor_protection {
        t.power_factor.enabled = v;
    }
    t
}

pub async fn handle(
    ctx: &Context,
    args: ThresholdsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    util::connect(ctx, global).await?;

    let thresholds = match args.command {
        ThresholdsCommand::Show => *ctx.manager.store().thresholds(),
        ThresholdsCommand::Set(set) => {
            let updated = apply(&set, &ctx.manager.store().thresholds());
            ctx.manager
                .push_thresholds(updated)
                .await
                .map_err(|e| match e {
                    CoreError::ValidationFailed { message } => CliError::Validation {
                        field: "thresholds".into(),
                        reason: message,
                    },
                    other => other.into(),
                })?;
            util::done(global, "Thresholds updated");
            updated
        }
    };

    let out = output::render_single(&output::format(global), &thresholds, detail, plain)?;
    output::print_output(&out, global.quiet);
    Ok(())
}
