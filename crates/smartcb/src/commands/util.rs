//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use smartcb_core::discovery::{detect_local_ipv4, parse_ipv4_cidr};
use smartcb_core::{CandidateSet, DEFAULT_PORT, DeviceEndpoint, DeviceManager, SyncReport};

use super::Context;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

/// Prefix swept around this machine's address when no subnet is given.
const LOCAL_SUBNET_PREFIX: u8 = 24;

/// Build the candidate set: common addresses plus, optionally, a subnet.
///
/// An explicit `subnet` always wins; otherwise `sweep_local` sweeps the
/// detected local /24, silently skipped when detection fails.
pub async fn candidates(
    subnet: Option<&str>,
    sweep_local: bool,
    port: u16,
) -> Result<CandidateSet, CliError> {
    let mut set = CandidateSet::common(port);
    if let Some(cidr) = subnet {
        let (host, prefix) = parse_ipv4_cidr(cidr).map_err(|e| CliError::Validation {
            field: "subnet".into(),
            reason: e.to_string(),
        })?;
        set.extend_subnet(host, prefix, port)
            .map_err(|e| CliError::Validation {
                field: "subnet".into(),
                reason: e.to_string(),
            })?;
    } else if sweep_local {
        match detect_local_ipv4().await {
            Some(local) => {
                set.extend_subnet(local, LOCAL_SUBNET_PREFIX, port)?;
            }
            None => debug!("no local IPv4 address; probing common addresses only"),
        }
    }
    Ok(set)
}

/// Scan with default options and require exactly one breaker.
pub async fn discover_single(
    ctx: &Context,
    global: &GlobalOpts,
) -> Result<DeviceEndpoint, CliError> {
    let port = global.port.unwrap_or(DEFAULT_PORT);
    let set = candidates(None, ctx.config.defaults.scan_subnet, port).await?;

    let spinner = spinner(global, &format!("Scanning {} addresses", set.len()));
    let result = ctx.manager.scan(&set).await;
    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }
    let result = result?;

    match result.devices.as_slice() {
        [] => Err(CliError::NoDeviceFound {
            probed: result.probed,
        }),
        [only] => {
            if !global.quiet {
                eprintln!("Found {} at {}", only.model, only.endpoint);
            }
            Ok(only.endpoint)
        }
        many => Err(CliError::AmbiguousDevice {
            count: many.len(),
            found: many
                .iter()
                .map(|d| d.endpoint.to_string())
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}

/// Connect `manager` to the resolved endpoint, scanning when none is set.
pub async fn connect_with(
    ctx: &Context,
    manager: &DeviceManager,
    global: &GlobalOpts,
) -> Result<SyncReport, CliError> {
    let endpoint = match ctx.endpoint {
        Some(endpoint) => endpoint,
        None => discover_single(ctx, global).await?,
    };
    let report = manager.connect(endpoint).await?;
    warn_degraded(&report, global.quiet);
    Ok(report)
}

/// [`connect_with`] using the context's own manager.
pub async fn connect(ctx: &Context, global: &GlobalOpts) -> Result<SyncReport, CliError> {
    connect_with(ctx, &ctx.manager, global).await
}

/// Tell the user which sync steps failed. The connection itself is usable.
pub fn warn_degraded(report: &SyncReport, quiet: bool) {
    if quiet {
        return;
    }
    for (step, reason) in report.failures() {
        eprintln!("warning: {step} sync failed: {reason}");
    }
}

/// A stderr spinner, only for interactive table output.
pub fn spinner(global: &GlobalOpts, message: &str) -> Option<ProgressBar> {
    let interactive = matches!(output::format(global), OutputFormat::Table)
        && !global.quiet
        && std::io::stderr().is_terminal();
    if !interactive {
        return None;
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} ({elapsed})") {
        bar.set_style(style);
    }
    bar.set_message(message.to_owned());
    bar.enable_steady_tick(Duration::from_millis(100));
    Some(bar)
}

/// One-line summary for a successful mutation.
pub fn done(global: &GlobalOpts, message: &str) {
    if !global.quiet {
        eprintln!("{message}");
    }
}
