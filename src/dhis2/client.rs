//! HTTP client for the DHIS2 endpoints used by the importer.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize};

use super::{
    analytics::{latest_imported_period, AnalyticsQuery, AnalyticsResponse},
    org_units::parse_regions,
    DataValueSet, Dhis2Error, ImportCount, TargetSystem,
};
use crate::{config::Dhis2Config, region::Region};

pub struct Dhis2Client {
    http: Client,
    base_url: String,
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct SystemInfo {
    version: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportSummary {
    import_count: Option<ImportCount>,
}

// Servers from 2.38 wrap the summary in a `response` envelope.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportEnvelope {
    response: Option<ImportSummary>,
    import_count: Option<ImportCount>,
}

impl ImportEnvelope {
    fn import_count(self) -> Option<ImportCount> {
        self.response
            .and_then(|r| r.import_count)
            .or(self.import_count)
    }
}

impl Dhis2Client {
    pub fn new(config: &Dhis2Config) -> Result<Self, Dhis2Error> {
        Ok(Dhis2Client {
            http: Client::builder().build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.http
            .get(self.url(path))
            .basic_auth(&self.username, Some(&self.password))
    }

    fn analytics_request(&self, data_element: &str, periods: &str, level: u32) -> RequestBuilder {
        let query = [
            ("dimension", format!("dx:{data_element}")),
            ("dimension", format!("pe:{periods}")),
            ("filter", format!("ou:LEVEL-{level}")),
            ("skipMeta", "true".to_string()),
        ];

        self.get("/api/analytics").query(&query)
    }

    fn submit_request(&self, payload: &DataValueSet, dry_run: bool) -> RequestBuilder {
        self.http
            .post(self.url("/api/dataValueSets"))
            .basic_auth(&self.username, Some(&self.password))
            .query(&[("dryRun", dry_run)])
            .json(payload)
    }
}

#[async_trait]
impl AnalyticsQuery for Dhis2Client {
    async fn latest_in(
        &self,
        data_element: &str,
        periods: &str,
        level: u32,
    ) -> Result<Option<String>, Dhis2Error> {
        let request = self.analytics_request(data_element, periods, level);
        let response: AnalyticsResponse = json(request.send().await?).await?;

        Ok(response.latest_period())
    }
}

#[async_trait]
impl TargetSystem for Dhis2Client {
    async fn system_version(&self) -> Result<String, Dhis2Error> {
        let info: SystemInfo = json(self.get("/api/system/info").send().await?).await?;
        Ok(info.version)
    }

    async fn org_units(&self, level: u32) -> Result<Vec<Region>, Dhis2Error> {
        let response = self
            .get("/api/organisationUnits.geojson")
            .query(&[("level", level)])
            .send()
            .await?;

        let body = checked(response).await?.text().await?;
        parse_regions(&body)
    }

    async fn latest_period(
        &self,
        data_element: &str,
        level: u32,
    ) -> Result<Option<String>, Dhis2Error> {
        latest_imported_period(self, data_element, level).await
    }

    async fn submit(
        &self,
        payload: &DataValueSet,
        dry_run: bool,
    ) -> Result<ImportCount, Dhis2Error> {
        let response = self.submit_request(payload, dry_run).send().await?;

        let envelope: ImportEnvelope = json(response).await?;
        envelope.import_count().ok_or(Dhis2Error::MissingImportCount)
    }
}

async fn checked(response: Response) -> Result<Response, Dhis2Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(Dhis2Error::Status { status, url, body })
}

async fn json<T: DeserializeOwned>(response: Response) -> Result<T, Dhis2Error> {
    Ok(checked(response).await?.json::<T>().await?)
}

// -- Tests -------------------------------------------------------------------
