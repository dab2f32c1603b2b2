mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use smartcb_core::{ConfigStore, DeviceManager};

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let Cli {
        mut global,
        command,
    } = cli;

    match command {
        // Completions never read the config file.
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "smartcb", &mut std::io::stdout());
            Ok(())
        }

        Command::Config(args) => {
            let cfg = smartcb_config::load_config()?;
            config::apply_output_default(&mut global, &cfg)?;
            commands::config_cmd::handle(args, &cfg, &global)
        }

        // Everything else talks to a breaker.
        cmd => {
            let cfg = smartcb_config::load_config()?;
            config::apply_output_default(&mut global, &cfg)?;
            let target = config::resolve_target(&global, &cfg)?;

            let store = ConfigStore::new(cfg.initial_thresholds()?);
            let manager = DeviceManager::new(target.manager, store);
            let ctx = commands::Context {
                manager,
                endpoint: target.endpoint,
                config: cfg,
            };

            tracing::debug!(command = ?cmd, "dispatching command");
            commands::dispatch(cmd, &ctx, &global).await
        }
    }
}
