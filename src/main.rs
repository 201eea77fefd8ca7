mod cds;
mod cli;
mod config;
mod dhis2;
mod download;
mod grid;
mod parquet;
mod period;
mod region;
mod transform;
mod units;

use std::process;

use anyhow::{Error, Result};
use chrono::Local;
use clap::Parser;
use cli::{command, Cli, Commands};
use config::Config;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    let config = match Config::from_settings(cli.settings, Local::now().date_naive()) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            error!("Create a .env file or set these environment variables.");
            process::exit(1);
        }
    };

    let result = match &cli.command {
        Commands::Import { export } => command::import(&config, export.as_deref()).await,
        Commands::Status {} => command::status(&config).await,
    };

    if let Err(e) = result {
        error!("{:#}", e);
        process::exit(1);
    }

    Ok(())
}
