//! Run configuration.
//!
//! Settings come from the environment (optionally seeded from a `.env` file)
//! or the equivalent command line flags, and are validated once into a
//! [`Config`] that is passed to everything that needs it.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{builder::BoolishValueParser, value_parser, ArgAction, Args};
use thiserror::Error;

use crate::{
    transform::Statistic,
    units::{self, UnitError},
};

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("End date {end} is before start date {start}")]
    DateRange { start: NaiveDate, end: NaiveDate },

    #[error("Invalid unit conversion: {0}")]
    Units(#[from] UnitError),
}

/// Raw settings as read from the environment and command line.
#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// CDS API endpoint
    #[arg(
        long,
        env = "CDSAPI_URL",
        default_value = "https://cds.climate.copernicus.eu/api"
    )]
    pub cdsapi_url: String,

    /// CDS personal access token
    #[arg(long, env = "CDSAPI_KEY", hide_env_values = true)]
    pub cdsapi_key: Option<String>,

    /// DHIS2 instance URL
    #[arg(long, env = "DHIS2_BASE_URL")]
    pub base_url: Option<String>,

    #[arg(long, env = "DHIS2_USERNAME")]
    pub username: Option<String>,

    #[arg(long, env = "DHIS2_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Data element receiving the values
    #[arg(long, env = "DHIS2_DATA_ELEMENT_ID")]
    pub data_element_id: Option<String>,

    /// ERA5-Land variable as named in the CDS catalogue
    #[arg(long, env = "DHIS2_VARIABLE", default_value = "total_precipitation")]
    pub variable: String,

    /// Name of the variable inside the downloaded files
    #[arg(long, env = "DHIS2_VALUE_COL", default_value = "tp")]
    pub value_col: String,

    /// Whether the variable accumulates over time and must be de-accumulated
    #[arg(
        long,
        env = "DHIS2_IS_CUMULATIVE",
        default_value = "true",
        value_parser = BoolishValueParser::new(),
        action = ArgAction::Set
    )]
    pub is_cumulative: bool,

    #[arg(long, env = "DHIS2_FROM_UNITS", default_value = "m")]
    pub from_units: String,

    #[arg(long, env = "DHIS2_TO_UNITS", default_value = "mm")]
    pub to_units: String,

    /// Statistic used to reduce hours to days
    #[arg(
        long,
        env = "DHIS2_TEMPORAL_AGGREGATION",
        value_enum,
        ignore_case = true,
        default_value = "sum"
    )]
    pub temporal_aggregation: Statistic,

    /// Statistic used to reduce grid cells to organisation units
    #[arg(
        long,
        env = "DHIS2_SPATIAL_AGGREGATION",
        value_enum,
        ignore_case = true,
        default_value = "mean"
    )]
    pub spatial_aggregation: Statistic,

    #[arg(long, env = "DHIS2_START_DATE", default_value = "2025-01-01")]
    pub start_date: NaiveDate,

    /// Last day to import [default: today]
    #[arg(long, env = "DHIS2_END_DATE")]
    pub end_date: Option<NaiveDate>,

    /// Folder caching downloaded files
    #[arg(long, env = "DHIS2_DOWNLOAD_FOLDER", default_value = "./target/data")]
    pub download_folder: PathBuf,

    #[arg(long, env = "DHIS2_DOWNLOAD_PREFIX", default_value = "era5_hourly")]
    pub download_prefix: String,

    /// Hours added to UTC timestamps before grouping them into days
    #[arg(
        long,
        env = "DHIS2_TIMEZONE_OFFSET",
        default_value_t = 0,
        allow_negative_numbers = true,
        value_parser = value_parser!(i32).range(-12..=14)
    )]
    pub timezone_offset: i32,

    /// Organisation unit level to aggregate to
    #[arg(
        long,
        env = "DHIS2_ORG_UNIT_LEVEL",
        default_value_t = 2,
        value_parser = value_parser!(u32).range(1..)
    )]
    pub org_unit_level: u32,

    /// Validate the import without persisting anything
    #[arg(
        long,
        env = "DHIS2_DRY_RUN",
        default_value = "true",
        value_parser = BoolishValueParser::new(),
        action = ArgAction::Set
    )]
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CdsConfig {
    pub url: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dhis2Config {
    pub base_url: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub cds: CdsConfig,
    pub dhis2: Dhis2Config,
    pub data_element_id: String,
    pub variable: String,
    pub value_col: String,
    pub is_cumulative: bool,
    pub from_units: String,
    pub to_units: String,
    pub temporal_aggregation: Statistic,
    pub spatial_aggregation: Statistic,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub download_folder: PathBuf,
    pub download_prefix: String,
    pub timezone_offset: i32,
    pub org_unit_level: u32,
    pub dry_run: bool,
}

impl Config {
    /// Validates raw settings. `today` is the default end date.
    pub fn from_settings(settings: Settings, today: NaiveDate) -> Result<Self, ConfigError> {
        let mut missing = Vec::new();
        let mut required = |value: Option<String>, key: &'static str| {
            let value = value.filter(|v| !v.trim().is_empty());
            if value.is_none() {
                missing.push(key);
            }
            value.unwrap_or_default()
        };

        let key = required(settings.cdsapi_key, "CDSAPI_KEY");
        let base_url = required(settings.base_url, "DHIS2_BASE_URL");
        let username = required(settings.username, "DHIS2_USERNAME");
        let password = required(settings.password, "DHIS2_PASSWORD");
        let data_element_id = required(settings.data_element_id, "DHIS2_DATA_ELEMENT_ID");

        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let end_date = settings.end_date.unwrap_or(today);
        if end_date < settings.start_date {
            return Err(ConfigError::DateRange {
                start: settings.start_date,
                end: end_date,
            });
        }

        units::conversion(&settings.from_units, &settings.to_units)?;

        Ok(Config {
            cds: CdsConfig {
                url: settings.cdsapi_url,
                key,
            },
            dhis2: Dhis2Config {
                base_url,
                username,
                password,
            },
            data_element_id,
            variable: settings.variable,
            value_col: settings.value_col,
            is_cumulative: settings.is_cumulative,
            from_units: settings.from_units,
            to_units: settings.to_units,
            temporal_aggregation: settings.temporal_aggregation,
            spatial_aggregation: settings.spatial_aggregation,
            start_date: settings.start_date,
            end_date,
            download_folder: settings.download_folder,
            download_prefix: settings.download_prefix,
            timezone_offset: settings.timezone_offset,
            org_unit_level: settings.org_unit_level,
            dry_run: settings.dry_run,
        })
    }
}

// -- Tests -------------------------------------------------------------------
