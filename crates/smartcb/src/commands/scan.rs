//! Scan command handler.

use std::time::Duration;

use tabled::{Table, Tabled, settings::Style};

use smartcb_core::{DEFAULT_PORT, DiscoveredDevice, ScanResult};

use super::{Context, util};
use crate::cli::{GlobalOpts, ScanArgs};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "URL")]
    url: String,
}

impl From<&DiscoveredDevice> for DeviceRow {
    fn from(d: &DiscoveredDevice) -> Self {
        Self {
            address: d.endpoint.to_string(),
            model: d.model.clone(),
            url: d.endpoint.base_url(),
        }
    }
}

fn detail(result: &ScanResult) -> String {
    let summary = format!(
        "{} found, {} probed in {}ms",
        result.devices.len(),
        result.probed,
        result.elapsed.as_millis()
    );
    if result.is_empty() {
        return summary;
    }
    let rows: Vec<DeviceRow> = result.devices.iter().map(DeviceRow::from).collect();
    let table = Table::new(rows).with(Style::rounded()).to_string();
    format!("{table}\n{summary}")
}

pub async fn handle(ctx: &Context, args: ScanArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let manager = ctx.manager_with(|config| {
        if let Some(concurrency) = args.concurrency {
            config.scan.concurrency = concurrency;
        }
        if let Some(ms) = args.probe_timeout_ms {
            config.scan.probe_timeout = Duration::from_millis(ms);
        }
    });

    let sweep_local = ctx.config.defaults.scan_subnet && !args.no_subnet;
    let port = global.port.unwrap_or(DEFAULT_PORT);
    let set = util::candidates(args.subnet.as_deref(), sweep_local, port).await?;

    let spinner = util::spinner(global, &format!("Probing {} addresses", set.len()));
    let result = manager.scan(&set).await;
    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }
    let result = result?;

    let out = output::render_single(&output::format(global), &result, detail, |r| {
        r.devices
            .iter()
            .map(|d| d.endpoint.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
