//! Downloads ERA5-Land data and imports it into DHIS2.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate};
use tracing::{info, warn};

use crate::{
    cds::{request::GRID_RESOLUTION, CdsClient, ClimateSource, DownloadRequest},
    config::Config,
    dhis2::{payload, Dhis2Client, ImportCount, TargetSystem},
    parquet, period,
    region::{BoundingBox, Region},
    transform::{self, spatial, temporal},
    units,
};

/// How a run ended.
#[derive(Debug, PartialEq)]
pub enum Outcome {
    NoNewData,
    Submitted(ImportCount),
}

pub async fn import(config: &Config, export: Option<&Path>) -> Result<()> {
    let target = Dhis2Client::new(&config.dhis2)?;

    info!(
        start = %config.start_date,
        end = %config.end_date,
        variable = %config.variable,
        download_folder = %config.download_folder.display(),
        dry_run = config.dry_run,
        "Starting import"
    );

    let source = CdsClient::new(&config.cds, Local::now().date_naive())?;

    match run(&source, &target, config, export).await? {
        Outcome::NoNewData => info!("No new data files to process"),
        Outcome::Submitted(count) => info!(
            imported = count.imported,
            updated = count.updated,
            ignored = count.ignored,
            deleted = count.deleted,
            "Done"
        ),
    }

    Ok(())
}

/// Checks DHIS2 is reachable and logs its version.
pub async fn connect<T: TargetSystem>(target: &T) -> Result<String> {
    let version = target
        .system_version()
        .await
        .context("Failed to connect to DHIS2")?;
    info!(version = %version, "Connected to DHIS2");

    Ok(version)
}

/// The first day to import, given what DHIS2 already holds.
pub async fn import_start<T: TargetSystem>(
    target: &T,
    config: &Config,
) -> Result<(Option<String>, NaiveDate)> {
    let last_imported = target
        .latest_period(&config.data_element_id, config.org_unit_level)
        .await
        .context("Failed to query last imported period")?;

    match &last_imported {
        Some(period) => info!(period = %period, "Last imported period"),
        None => info!("No existing data found"),
    }

    let start = period::resolve_start(last_imported.as_deref(), config.start_date)?;
    Ok((last_imported, start))
}

pub async fn fetch_regions<T: TargetSystem>(target: &T, config: &Config) -> Result<Vec<Region>> {
    info!("Fetching organisation units from DHIS2...");
    let regions = target
        .org_units(config.org_unit_level)
        .await
        .context("Failed to fetch organisation units")?;
    info!(
        count = regions.len(),
        level = config.org_unit_level,
        "Found organisation units"
    );

    Ok(regions)
}

/// Runs the pipeline from organisation units to submission.
pub async fn run<S: ClimateSource, T: TargetSystem>(
    source: &S,
    target: &T,
    config: &Config,
    export: Option<&Path>,
) -> Result<Outcome> {
    connect(target).await?;

    let regions = fetch_regions(target, config).await?;
    let bbox = BoundingBox::enclosing(&regions)
        .ok_or_else(|| {
            anyhow!(
                "No organisation units with boundaries at level {}",
                config.org_unit_level
            )
        })?
        .snapped(GRID_RESOLUTION);

    let (_, start) = import_start(target, config).await?;
    info!(start = %start, end = %config.end_date, "Import window");

    let request = DownloadRequest {
        start,
        end: config.end_date,
        bbox,
        variables: vec![config.variable.clone()],
        folder: config.download_folder.clone(),
        prefix: config.download_prefix.clone(),
    };

    info!("Downloading ERA5-Land data...");
    let files = source
        .download(&request)
        .await
        .context("Failed to download ERA5-Land data")?;
    if files.is_empty() {
        return Ok(Outcome::NoNewData);
    }
    info!(count = files.len(), "Downloaded files");

    info!("Loading data from files...");
    let mut hourly = source
        .load(&files, &config.value_col)
        .context("Failed to load downloaded data")?;

    if config.is_cumulative {
        info!("Converting cumulative to incremental variable...");
        hourly = transform::deaccumulate(&hourly);
    }

    info!(how = %config.temporal_aggregation, "Aggregating temporally...");
    let daily = temporal::daily_reduce(
        &hourly,
        config.temporal_aggregation,
        config.timezone_offset,
    );

    info!(how = %config.spatial_aggregation, "Aggregating to organisation units...");
    let mut values = spatial::reduce(&daily, &regions, config.spatial_aggregation);

    match units::conversion(&config.from_units, &config.to_units)? {
        Some(conversion) => {
            info!(from = %config.from_units, to = %config.to_units, "Applying unit conversion...");
            for row in values.iter_mut() {
                row.value = conversion.apply(row.value);
            }
        }
        None => info!("No unit conversion needed"),
    }

    if let Some(path) = export {
        parquet::save_values(&values, path)?;
        info!(file = %path.display(), rows = values.len(), "Exported aggregated values");
    }

    let (payload, skipped) = payload::build(&values, &config.data_element_id);
    if skipped > 0 {
        warn!(skipped, "Skipped values without data");
    }
    if payload.is_empty() {
        return Ok(Outcome::NoNewData);
    }

    info!(count = payload.len(), "Created payload");
    info!(
        "{}...",
        if config.dry_run { "DRY RUN" } else { "IMPORTING" }
    );
    let count = target
        .submit(&payload, config.dry_run)
        .await
        .context("Failed to submit data values")?;
    info!(
        imported = count.imported,
        updated = count.updated,
        ignored = count.ignored,
        deleted = count.deleted,
        "Result"
    );

    Ok(Outcome::Submitted(count))
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::{path::PathBuf, sync::Mutex};

    use async_trait::async_trait;
    use chrono::{Duration, NaiveDateTime};
    use ndarray::Array3;
    use tempfile::TempDir;

    use super::*;
    use crate::{
        cds::CdsError,
        config::tests::config,
        dhis2::{DataValueSet, Dhis2Error},
        grid::{GridError, HourlyGrid},
        region::tests::square,
    };

    struct FakeSource {
        grid: HourlyGrid,
        files: Vec<PathBuf>,
        requests: Mutex<Vec<DownloadRequest>>,
    }

    #[async_trait]
    impl ClimateSource for FakeSource {
        async fn download(&self, request: &DownloadRequest) -> Result<Vec<PathBuf>, CdsError> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(self.files.clone())
        }

        fn load(&self, _files: &[PathBuf], _value_col: &str) -> Result<HourlyGrid, GridError> {
            Ok(self.grid.clone())
        }
    }

    struct FakeTarget {
        online: bool,
        regions: Vec<Region>,
        last_imported: Option<String>,
        submitted: Mutex<Vec<(DataValueSet, bool)>>,
    }

    #[async_trait]
    impl TargetSystem for FakeTarget {
        async fn system_version(&self) -> Result<String, Dhis2Error> {
            if !self.online {
                return Err(Dhis2Error::Status {
                    status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                    url: "https://dhis2.example.org/api/system/info".to_string(),
                    body: String::new(),
                });
            }
            Ok("2.40.3".to_string())
        }

        async fn org_units(&self, _level: u32) -> Result<Vec<Region>, Dhis2Error> {
            Ok(self.regions.clone())
        }

        async fn latest_period(
            &self,
            _data_element: &str,
            _level: u32,
        ) -> Result<Option<String>, Dhis2Error> {
            Ok(self.last_imported.clone())
        }

        async fn submit(
            &self,
            payload: &DataValueSet,
            dry_run: bool,
        ) -> Result<ImportCount, Dhis2Error> {
            self.submitted.lock().unwrap().push((payload.clone(), dry_run));
            Ok(ImportCount {
                imported: payload.len() as u64,
                ..ImportCount::default()
            })
        }
    }

    // Two days of cumulative precipitation in metres on a single cell,
    // accumulating 0.001 m every hour and resetting at 01:00 UTC.
    fn cumulative_grid() -> HourlyGrid {
        let start =
            NaiveDateTime::parse_from_str("2025-02-01 00:00", "%Y-%m-%d %H:%M").unwrap();
        let times: Vec<NaiveDateTime> = (0..48).map(|h| start + Duration::hours(h)).collect();
        let values: Vec<f64> = times
            .iter()
            .map(|t| {
                let hours_since_reset = (t.and_utc().timestamp() / 3600 - 1).rem_euclid(24) + 1;
                0.001 * hours_since_reset as f64
            })
            .collect();

        HourlyGrid {
            times,
            latitudes: vec![-1.5],
            longitudes: vec![30.5],
            values: Array3::from_shape_vec((48, 1, 1), values).unwrap(),
        }
    }

    fn source(files: Vec<PathBuf>) -> FakeSource {
        FakeSource {
            grid: cumulative_grid(),
            files,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn target(last_imported: Option<&str>) -> FakeTarget {
        FakeTarget {
            online: true,
            regions: vec![square("ou1", 30.0, -2.0, 1.0), square("ou2", 40.0, 10.0, 1.0)],
            last_imported: last_imported.map(str::to_string),
            submitted: Mutex::new(Vec::new()),
        }
    }

    #[tokio::test]
    async fn should_import_daily_totals_in_millimetres() {
        let source = source(vec![PathBuf::from("era5.nc")]);
        let target = target(None);

        let outcome = run(&source, &target, &config(), None).await.unwrap();

        let submitted = target.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        let (payload, dry_run) = &submitted[0];
        assert!(*dry_run);

        // ou2 has no grid cells and is skipped
        assert_eq!(payload.len(), 2);
        assert!(payload.data_values.iter().all(|v| v.org_unit == "ou1"));
        assert!(payload.data_values.iter().all(|v| v.data_element == "deUid"));
        assert_eq!(payload.data_values[0].period, "20250201");
        assert_eq!(payload.data_values[1].period, "20250202");

        // 00:00 is dropped by de-accumulation, leaving 23 then 24 hourly mm
        let day1: f64 = payload.data_values[0].value.parse().unwrap();
        let day2: f64 = payload.data_values[1].value.parse().unwrap();
        assert!((day1 - 23.0).abs() < 1e-9, "{day1}");
        assert!((day2 - 24.0).abs() < 1e-9, "{day2}");

        assert_eq!(
            outcome,
            Outcome::Submitted(ImportCount {
                imported: 2,
                ..ImportCount::default()
            })
        );
    }

    #[tokio::test]
    async fn should_submit_for_real_when_not_dry_run() {
        let source = source(vec![PathBuf::from("era5.nc")]);
        let target = target(None);
        let mut config = config();
        config.dry_run = false;

        run(&source, &target, &config, None).await.unwrap();

        assert!(!target.submitted.lock().unwrap()[0].1);
    }

    #[tokio::test]
    async fn should_start_download_at_last_imported_month() {
        let source = source(vec![PathBuf::from("era5.nc")]);
        let target = target(Some("202502"));

        run(&source, &target, &config(), None).await.unwrap();

        let requests = source.requests.lock().unwrap();
        assert_eq!(requests[0].start, NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
        assert_eq!(requests[0].end, NaiveDate::from_ymd_opt(2025, 6, 30).unwrap());
        assert_eq!(requests[0].variables, vec!["total_precipitation".to_string()]);
        assert_eq!(requests[0].bbox.area(), [11.0, 30.0, -2.0, 41.0]);
    }

    #[tokio::test]
    async fn should_stop_without_new_files() {
        let source = source(Vec::new());
        let target = target(None);

        let outcome = run(&source, &target, &config(), None).await.unwrap();

        assert_eq!(outcome, Outcome::NoNewData);
        assert!(target.submitted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_fail_without_regions() {
        let source = source(vec![PathBuf::from("era5.nc")]);
        let mut target = target(None);
        target.regions.clear();

        assert!(run(&source, &target, &config(), None).await.is_err());
        assert!(source.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_stop_when_dhis2_is_unreachable() {
        let source = source(vec![PathBuf::from("era5.nc")]);
        let mut target = target(None);
        target.online = false;

        let err = run(&source, &target, &config(), None).await.unwrap_err();

        assert!(err.to_string().contains("Failed to connect to DHIS2"));
        assert!(source.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_pass_instantaneous_values_through() {
        let source = source(vec![PathBuf::from("era5.nc")]);
        let target = target(None);
        let mut config = config();
        config.is_cumulative = false;
        config.temporal_aggregation = transform::Statistic::Max;
        config.to_units = "m".to_string();

        run(&source, &target, &config, None).await.unwrap();

        let submitted = target.submitted.lock().unwrap();
        let value: f64 = submitted[0].0.data_values[0].value.parse().unwrap();
        assert!((value - 0.024).abs() < 1e-12, "{value}");
    }

    #[tokio::test]
    async fn should_export_aggregated_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("values.parquet");
        let source = source(vec![PathBuf::from("era5.nc")]);
        let target = target(None);

        run(&source, &target, &config(), Some(&path)).await.unwrap();

        assert!(path.exists());
    }
}
