use anyhow::{Context, Result};
use clap::Parser;
use selector_healing::cli::commands::{cmd_heal, cmd_learn, cmd_serve, heal_exit_code};
use selector_healing::cli::config::{Cli, Commands, load_config, resolve_config};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Resolve settings: CLI > env > config file > defaults
    let config = resolve_config(load_config(cli.config.as_deref()), &cli)
        .context("Invalid configuration")?;

    match cli.command {
        Commands::Serve { host, port } => cmd_serve(config, host, port)?,
        Commands::Learn {
            page,
            id,
            snapshot,
            server,
        } => {
            let stored = cmd_learn(&config, &page, &id, &snapshot, server.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&stored)?);
        }
        Commands::Heal {
            page,
            broken_id,
            snapshot,
            server,
        } => {
            let outcome = cmd_heal(&config, &page, &broken_id, &snapshot, server.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            std::process::exit(heal_exit_code(&outcome));
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "selector_healing=info,tower_http=info",
        1 => "selector_healing=debug,tower_http=debug",
        _ => "selector_healing=trace,tower_http=trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
