//! Config subcommand handlers.

use smartcb_config::{Config, Profile};

use super::util;
use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

fn available(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        "(none)".into()
    } else {
        cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

pub fn handle(args: ConfigArgs, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let out = output::render_single(
                &output::format(global),
                cfg,
                |c| toml::to_string_pretty(c).unwrap_or_else(|e| format!("{c:#?}\n# {e}")),
                |c| c.profiles.keys().cloned().collect::<Vec<_>>().join("\n"),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(
                &smartcb_config::config_path().display().to_string(),
                global.quiet,
            );
            Ok(())
        }

        ConfigCommand::SetDevice { host, port } => {
            let mut cfg = cfg.clone();
            let name = config::active_profile_name(global, &cfg);

            let mut profile = Profile {
                host,
                port,
                timeout_ms: cfg.profiles.get(&name).and_then(|p| p.timeout_ms),
            };
            let endpoint = profile.endpoint()?;
            profile.host = endpoint.host.to_string();

            cfg.profiles.insert(name.clone(), profile);
            if cfg.default_profile.is_none() {
                cfg.default_profile = Some(name.clone());
            }
            let path = smartcb_config::save_config(&cfg)?;
            util::done(
                global,
                &format!("Profile '{name}' now points at {endpoint} ({})", path.display()),
            );
            Ok(())
        }

        ConfigCommand::Profiles => {
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                util::done(global, "No profiles configured. Run: smartcb connect --save");
            } else {
                let lines: Vec<String> = cfg
                    .profiles
                    .iter()
                    .map(|(name, p)| {
                        let marker = if name == default { " *" } else { "" };
                        format!("{name}{marker}\t{}:{}", p.host, p.port)
                    })
                    .collect();
                output::print_output(&lines.join("\n"), global.quiet);
            }
            Ok(())
        }

        ConfigCommand::Use { name } => {
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: available(cfg),
                    name,
                });
            }
            let mut cfg = cfg.clone();
            cfg.default_profile = Some(name.clone());
            smartcb_config::save_config(&cfg)?;
            util::done(global, &format!("Default profile set to '{name}'"));
            Ok(())
        }
    }
}
