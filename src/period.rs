//! Conversion between DHIS2 period identifiers and calendar dates.
//!
//! DHIS2 writes periods in a compact numeric notation: `2025` for a year,
//! `202502` for a month and `20250214` for a day.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum PeriodError {
    #[error("Unrecognised DHIS2 period `{0}`")]
    Malformed(String),
}

/// Returns the first day covered by a DHIS2 period.
///
/// Only the year and month of a period are significant, so a daily period
/// resolves to the first day of its month.
pub fn period_start(period: &str) -> Result<NaiveDate, PeriodError> {
    let malformed = || PeriodError::Malformed(period.to_string());

    if !period.chars().all(|c| c.is_ascii_digit()) {
        return Err(malformed());
    }

    let (year, month) = match period.len() {
        4 => (&period[0..4], "01"),
        6 | 8 => (&period[0..4], &period[4..6]),
        _ => return Err(malformed()),
    };

    let year = year.parse::<i32>().map_err(|_| malformed())?;
    let month = month.parse::<u32>().map_err(|_| malformed())?;

    NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(malformed)
}

/// Resolves the first date of this run's import window.
///
/// Without a previous import the configured start is used as is. Otherwise the
/// window starts at the later of the configured start and the first day of
/// the last imported period.
pub fn resolve_start(
    last_imported: Option<&str>,
    configured_start: NaiveDate,
) -> Result<NaiveDate, PeriodError> {
    match last_imported {
        None => Ok(configured_start),
        Some(period) => Ok(period_start(period)?.max(configured_start)),
    }
}

/// Formats a date as a DHIS2 daily period.
pub fn daily_period(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

// -- Tests -------------------------------------------------------------------
