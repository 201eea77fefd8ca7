//! DHIS2 Web API access.

pub mod analytics;
pub mod client;
pub mod org_units;
pub mod payload;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::region::Region;

pub use client::Dhis2Client;
pub use payload::{DataValue, DataValueSet};

#[derive(Error, Debug)]
pub enum Dhis2Error {
    #[error("DHIS2 request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("DHIS2 returned {status} for {url}: {body}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
        body: String,
    },

    #[error("Invalid organisation unit GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("Import response has no importCount")]
    MissingImportCount,
}

/// Counts reported by DHIS2 after a data value set import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ImportCount {
    pub imported: u64,
    pub updated: u64,
    pub ignored: u64,
    pub deleted: u64,
}

/// The DHIS2 capabilities an import run needs.
#[async_trait]
pub trait TargetSystem: Sync {
    /// The server version from `/api/system/info`.
    async fn system_version(&self) -> Result<String, Dhis2Error>;

    /// Organisation units at a hierarchy level, with their boundaries.
    async fn org_units(&self, level: u32) -> Result<Vec<Region>, Dhis2Error>;

    /// The latest period with data for a data element at a level, as `YYYYMM`.
    async fn latest_period(
        &self,
        data_element: &str,
        level: u32,
    ) -> Result<Option<String>, Dhis2Error>;

    /// Posts a batch of data values. With `dry_run` nothing is persisted.
    async fn submit(&self, payload: &DataValueSet, dry_run: bool)
        -> Result<ImportCount, Dhis2Error>;
}
