//! Connect command handler.

use std::fmt::Write as _;

use smartcb_config::Profile;
use smartcb_core::{DeviceEndpoint, SyncReport};

use super::{Context, util};
use crate::cli::{ConnectArgs, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

/// Table rendering of a sync report, shared with `time sync`.
pub fn detail(report: &SyncReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Device:     {} ({})", report.device.model, report.endpoint);
    if let Some(ref name) = report.device.name {
        let _ = writeln!(out, "Name:       {name}");
    }
    if let Some(ref firmware) = report.device.firmware {
        let _ = writeln!(out, "Firmware:   {firmware}");
    }
    if let Some(ref mac) = report.device.mac {
        let _ = writeln!(out, "MAC:        {mac}");
    }
    let _ = writeln!(out, "Settings:   {}", report.settings);
    let _ = writeln!(out, "Schedules:  {}", report.schedules);
    let _ = write!(out, "Clock:      {}", report.clock);
    out
}

pub async fn handle(ctx: &Context, args: ConnectArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let endpoint = match args.target.as_deref() {
        Some(target) => Some(target.parse::<DeviceEndpoint>().map_err(|e| {
            CliError::Validation {
                field: "target".into(),
                reason: e.to_string(),
            }
        })?),
        None => ctx.endpoint,
    };

    let report = match endpoint {
        Some(endpoint) => {
            let report = ctx.manager.connect(endpoint).await?;
            util::warn_degraded(&report, global.quiet);
            report
        }
        None => util::connect(ctx, global).await?,
    };

    if args.save {
        let name = config::active_profile_name(global, &ctx.config);
        let mut cfg = ctx.config.clone();
        cfg.profiles
            .insert(name.clone(), Profile::new(report.endpoint));
        if cfg.default_profile.is_none() {
            cfg.default_profile = Some(name.clone());
        }
        let path = smartcb_config::save_config(&cfg)?;
        util::done(
            global,
            &format!("Saved {} as profile '{name}' in {}", report.endpoint, path.display()),
        );
    }

    let out = output::render_single(&output::format(global), &report, detail, |r| {
        r.endpoint.to_string()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
