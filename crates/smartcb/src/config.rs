//! Flag resolution on top of `smartcb_config`.
//!
//! Precedence is flag > env var > profile > `[defaults]`. Core only ever
//! receives the resulting `DeviceEndpoint` and `ManagerConfig`.

use std::time::Duration;

use clap::ValueEnum;

use smartcb_config::{Config, ConfigError};
use smartcb_core::{DeviceEndpoint, ManagerConfig};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;

/// Where to find the breaker and how to talk to it.
#[derive(Debug, Clone)]
pub struct Target {
    /// `None` means no address is configured; commands fall back to a scan.
    pub endpoint: Option<DeviceEndpoint>,
    pub manager: ManagerConfig,
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Translate config + global flags into a [`Target`].
pub fn resolve_target(global: &GlobalOpts, config: &Config) -> Result<Target, CliError> {
    let profile = config
        .profile(global.profile.as_deref())
        .map_err(|e| profile_error(e, config))?;

    let (mut endpoint, mut manager) = match profile {
        Some((_, profile)) => {
            let (endpoint, manager) =
                smartcb_config::profile_to_manager_config(profile, &config.defaults)?;
            (Some(endpoint), manager)
        }
        None => (None, config.defaults.manager_config()),
    };

    if let Some(host) = global.host.as_deref() {
        let port = global
            .port
            .or(endpoint.map(|e| e.port))
            .map(|p| p.to_string())
            .unwrap_or_default();
        let parsed = DeviceEndpoint::parse(host, &port).map_err(|e| CliError::Validation {
            field: "host".into(),
            reason: e.to_string(),
        })?;
        endpoint = Some(parsed);
    } else if let (Some(port), Some(ep)) = (global.port, endpoint.as_mut()) {
        ep.port = port;
    }

    if let Some(ms) = global.timeout_ms {
        manager.timeout = Duration::from_millis(ms);
    }

    Ok(Target { endpoint, manager })
}

/// Fill in `--output` from `defaults.output` when the flag was not given.
pub fn apply_output_default(global: &mut GlobalOpts, config: &Config) -> Result<(), CliError> {
    if global.output.is_none() {
        let format = OutputFormat::from_str(&config.defaults.output, true).map_err(|_| {
            CliError::Validation {
                field: "defaults.output".into(),
                reason: format!("unknown output format '{}'", config.defaults.output),
            }
        })?;
        global.output = Some(format);
    }
    Ok(())
}

fn profile_error(err: ConfigError, config: &Config) -> CliError {
    match err {
        ConfigError::UnknownProfile { profile } => {
            let available = if config.profiles.is_empty() {
                "(none)".to_owned()
            } else {
                config.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
            };
            CliError::ProfileNotFound {
                name: profile,
                available,
            }
        }
        other => other.into(),
    }
}
