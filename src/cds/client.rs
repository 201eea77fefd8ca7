//! Client for the CDS Retrieve API v1.
//!
//! A retrieval is an asynchronous job: the request is submitted, the job is
//! polled until it completes, and the produced asset is downloaded.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, info};

use super::{
    request::{latest_available, month_chunks, MonthChunk, RetrieveRequest},
    CdsError, ClimateSource, DownloadRequest,
};
use crate::{
    cli::create_spinner,
    config::CdsConfig,
    download::download_with_progress,
    grid::{self, GridError, HourlyGrid},
};

const DATASET: &str = "reanalysis-era5-land";
const POLL_INTERVAL: Duration = Duration::from_secs(5);

pub struct CdsClient {
    http: Client,
    url: String,
    key: String,
    today: NaiveDate,
}

#[derive(Debug, Deserialize)]
struct JobStatus {
    #[serde(rename = "jobID")]
    job_id: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct JobResults {
    asset: Asset,
}

#[derive(Debug, Deserialize)]
struct Asset {
    value: AssetValue,
}

#[derive(Debug, Deserialize)]
struct AssetValue {
    href: String,
}

impl CdsClient {
    /// `today` bounds the window to what has been published.
    pub fn new(config: &CdsConfig, today: NaiveDate) -> Result<Self, CdsError> {
        Ok(CdsClient {
            http: Client::builder().build()?,
            url: config.url.trim_end_matches('/').to_string(),
            key: config.key.clone(),
            today,
        })
    }

    fn authorised(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("PRIVATE-TOKEN", &self.key)
    }

    async fn submit(&self, body: &RetrieveRequest) -> Result<JobStatus, CdsError> {
        let url = format!("{}/retrieve/v1/processes/{}/execution", self.url, DATASET);
        let response = self.authorised(self.http.post(url)).json(body).send().await?;
        json(response).await
    }

    async fn job(&self, job_id: &str) -> Result<JobStatus, CdsError> {
        let url = format!("{}/retrieve/v1/jobs/{}", self.url, job_id);
        json(self.authorised(self.http.get(url)).send().await?).await
    }

    async fn results(&self, job_id: &str) -> Result<JobResults, CdsError> {
        let url = format!("{}/retrieve/v1/jobs/{}/results", self.url, job_id);
        json(self.authorised(self.http.get(url)).send().await?).await
    }

    async fn retrieve(
        &self,
        chunk: &MonthChunk,
        request: &DownloadRequest,
        path: &Path,
    ) -> Result<(), CdsError> {
        let body = RetrieveRequest {
            inputs: chunk.inputs(&request.variables, &request.bbox),
        };

        let bar = create_spinner(format!(
            "Waiting for CDS ({} to {})...",
            chunk.first, chunk.last
        ));

        let mut job = self.submit(&body).await?;
        info!(
            job_id = %job.job_id,
            first = %chunk.first,
            last = %chunk.last,
            "Submitted CDS request"
        );

        loop {
            match job.status.as_str() {
                "successful" => break,
                "failed" | "dismissed" => {
                    bar.abandon_with_message("CDS request failed");
                    return Err(CdsError::JobFailed {
                        job_id: job.job_id,
                        status: job.status,
                    });
                }
                status => debug!(job_id = %job.job_id, status, "CDS job pending"),
            }
            tokio::time::sleep(POLL_INTERVAL).await;
            job = self.job(&job.job_id).await?;
        }

        let results = self.results(&job.job_id).await?;
        bar.set_message(format!("Downloading {}", path.display()));
        let bytes = download_with_progress(&self.http, &results.asset.value.href, path, bar.clone())
            .await?;
        bar.finish_with_message(format!("Downloaded {}", path.display()));
        info!(file = %path.display(), bytes, "Downloaded ERA5-Land data");

        Ok(())
    }
}

#[async_trait]
impl ClimateSource for CdsClient {
    async fn download(&self, request: &DownloadRequest) -> Result<Vec<PathBuf>, CdsError> {
        let end = request.end.min(latest_available(self.today));
        let chunks = month_chunks(request.start, end);
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        fs::create_dir_all(&request.folder)?;

        let mut files = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            let path = request
                .folder
                .join(chunk.file_name(&request.prefix, &request.variables));

            if path.exists() {
                debug!(file = %path.display(), "Using cached download");
            } else {
                self.retrieve(chunk, request, &path).await?;
            }
            files.push(path);
        }

        Ok(files)
    }

    fn load(&self, files: &[PathBuf], value_col: &str) -> Result<HourlyGrid, GridError> {
        grid::open_hourly(files, value_col)
    }
}

async fn json<T: DeserializeOwned>(response: Response) -> Result<T, CdsError> {
    let status = response.status();
    if !status.is_success() {
        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();
        return Err(CdsError::Status { status, url, body });
    }

    Ok(response.json::<T>().await?)
}

// -- Tests -------------------------------------------------------------------
