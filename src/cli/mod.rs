//! Command line interface.

pub mod command;

use std::{path::PathBuf, time::Duration};

use clap::{command, Parser, Subcommand};
use indicatif::ProgressBar;

use crate::config::Settings;

#[derive(Parser)]
#[command(version, about, long_about = None)]
/// Imports ERA5-Land climate data into DHIS2
pub struct Cli {
    #[command(flatten)]
    pub settings: Settings,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download, aggregate and import new data
    Import {
        /// Also save the aggregated values to this parquet file
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Show the last imported period and the next import window
    Status {},
}

/// Creates a spinner.
pub fn create_spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner().with_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));

    bar
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn should_have_valid_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn should_parse_import_with_export() {
        let cli =
            Cli::try_parse_from(["era5-dhis2", "import", "--export", "values.parquet"]).unwrap();

        match cli.command {
            Commands::Import { export } => {
                assert_eq!(export, Some(PathBuf::from("values.parquet")))
            }
            Commands::Status {} => panic!("expected import"),
        }
    }
}
