//! Reports what the next import would fetch, without downloading anything.

use anyhow::Result;
use chrono::Local;

use super::import::{connect, fetch_regions, import_start};
use crate::{
    cds::request::latest_available,
    config::Config,
    dhis2::{Dhis2Client, TargetSystem},
    region::BoundingBox,
};

pub async fn status(config: &Config) -> Result<()> {
    let target = Dhis2Client::new(&config.dhis2)?;
    let report = report(&target, config, Local::now().date_naive()).await?;

    println!("{}", report);

    Ok(())
}

async fn report<T: TargetSystem>(
    target: &T,
    config: &Config,
    today: chrono::NaiveDate,
) -> Result<String> {
    let version = connect(target).await?;
    let regions = fetch_regions(target, config).await?;
    let (last_imported, start) = import_start(target, config).await?;
    let end = config.end_date.min(latest_available(today));

    let bbox = BoundingBox::enclosing(&regions)
        .map(|b| format!("{:?}", b.area()))
        .unwrap_or_else(|| "-".to_string());

    let window = if start > end {
        "up to date".to_string()
    } else {
        format!("{} to {}", start, end)
    };

    Ok(format!(
        "DHIS2 version:         {}\n\
         Data element:          {}\n\
         Organisation units:    {} at level {}\n\
         Area (N, W, S, E):     {}\n\
         Last imported period:  {}\n\
         Next import window:    {}",
        version,
        config.data_element_id,
        regions.len(),
        config.org_unit_level,
        bbox,
        last_imported.as_deref().unwrap_or("none"),
        window,
    ))
}

// -- Tests -------------------------------------------------------------------
