//! ERA5-Land acquisition from the Copernicus Climate Data Store.

pub mod client;
pub mod request;

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::{
    grid::{GridError, HourlyGrid},
    region::BoundingBox,
};

pub use client::CdsClient;

#[derive(Error, Debug)]
pub enum CdsError {
    #[error("CDS request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CDS returned {status} for {url}: {body}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
        body: String,
    },

    #[error("CDS job {job_id} ended with status `{status}`")]
    JobFailed { job_id: String, status: String },

    #[error("Failed to write download cache: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Everything needed to fetch one import window.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadRequest {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub bbox: BoundingBox,
    pub variables: Vec<String>,
    pub folder: PathBuf,
    pub prefix: String,
}

/// Source of hourly gridded climate data.
#[async_trait]
pub trait ClimateSource: Sync {
    /// Fetches the window, reusing cached files, and returns the files that
    /// cover it. An empty list means there is nothing new to import.
    async fn download(&self, request: &DownloadRequest) -> Result<Vec<PathBuf>, CdsError>;

    /// Loads one variable from downloaded files.
    fn load(&self, files: &[PathBuf], value_col: &str) -> Result<HourlyGrid, GridError>;
}
