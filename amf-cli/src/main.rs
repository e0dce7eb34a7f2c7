mod cli;
mod commands;
mod config;
mod output;

use crate::{
    cli::{Args, Commands},
    commands::CommandExecutor,
    config::AppConfig,
    output::write_output,
};
use anyhow::Result;
use clap::Parser;
use std::process;
use tracing::{Level, debug, error, info};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

fn main() {
    if let Err(e) = run() {
        error!("Application error: {:#}", e);
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet)?;

    // Load configuration
    let config = AppConfig::load(args.config.as_deref())?;
    debug!("Loaded configuration:\n{}", config.show()?);

    let executor = CommandExecutor::new(config)?;

    match args.command {
        Commands::Decode {
            input,
            offset,
            uncompress,
            count,
            pretty,
            output_file,
        } => {
            let json = executor.decode(&input, offset, uncompress.map(Into::into), count, pretty)?;
            write_output(&json, output_file.as_deref())?;
        }

        Commands::Encode {
            input,
            output,
            compress,
            strict_arrays,
        } => {
            let saved = executor.encode(&input, &output, compress.map(Into::into), strict_arrays)?;
            info!("Wrote {} bytes to {}", saved, output.display());
        }

        Commands::Info { input } => {
            let report = executor.info(&input)?;
            write_output(&report, None)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) -> Result<()> {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(verbose)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();

    Ok(())
}
