use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use ua_cli::commands::{import, latency, serve, status};
use ua_cli::{Cli, Commands, Config};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match command {
        Commands::Serve(args) => serve::run(&args, &config)?,
        Commands::Latency(args) => latency::run(&mut out, &args, &config)?,
        Commands::Import(args) => {
            let summary = import::run(&args, &config)?;
            writeln!(
                out,
                "Imported {} of {} events ({} new sessions)",
                summary.inserted, summary.read, summary.sessions_created
            )?;
        }
        Commands::Status => status::run(&mut out, &config)?,
    }

    Ok(())
}
