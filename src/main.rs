mod cli;
mod config;
mod dataset;
mod download;
mod error;
mod index;
mod manager;
mod meteo;
mod modifier;
mod plotter;
mod reading;
mod source;
mod variable;
mod view;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use cli::{command, Cli, Commands};
use tracing_subscriber::EnvFilter;

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

/// Runs one command. `Ok(false)` means it finished but something in it failed.
async fn dispatch(command: Commands) -> Result<bool> {
    match command {
        Commands::Run {
            config,
            output,
            cache_dir,
        } => {
            let summary = command::run(config, output, cache_dir).await?;
            println!(
                "{} plots written ({} failed), index saved to `{}`",
                summary.plotted,
                summary.failed,
                summary.index.display()
            );
            if !summary.skipped_plotters.is_empty() {
                eprintln!("Skipped plotters: {}", summary.skipped_plotters.join(", "));
            }
            Ok(summary.is_complete())
        }
        Commands::Fetch { config } => command::fetch(config).await.map(|_| true),
        Commands::Variables {} => command::variables().map(|_| true),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    match dispatch(cli.command).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
