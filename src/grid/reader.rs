//! Reads CDS NetCDF downloads into an [`HourlyGrid`].

use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate, NaiveDateTime};
use ndarray::Array3;
use netcdf::{AttributeValue, Variable};
use tracing::debug;

use super::{Grid, GridError, HourlyGrid};

const TIME_VARIABLES: [&str; 2] = ["valid_time", "time"];

/// Loads every file and joins them along the time axis.
pub fn open_hourly(files: &[PathBuf], value_col: &str) -> Result<HourlyGrid, GridError> {
    let parts = files
        .iter()
        .map(|file| read_file(file, value_col))
        .collect::<Result<Vec<_>, _>>()?;

    Grid::concat(parts)
}

fn read_file(path: &Path, value_col: &str) -> Result<HourlyGrid, GridError> {
    let file = netcdf::open(path)?;

    let latitudes = read_numeric(&variable(&file, "latitude")?)?;
    let longitudes = read_numeric(&variable(&file, "longitude")?)?;

    let time_var = TIME_VARIABLES
        .iter()
        .find_map(|name| file.variable(name))
        .ok_or_else(|| GridError::MissingVariable(TIME_VARIABLES.join(" or ")))?;
    let times = read_times(&time_var)?;

    let var = variable(&file, value_col)?;
    let raw = read_numeric(&var)?;

    let shape = (times.len(), latitudes.len(), longitudes.len());
    let expected = shape.0 * shape.1 * shape.2;
    if raw.len() != expected {
        return Err(GridError::Shape {
            variable: value_col.to_string(),
            found: raw.len(),
            expected,
        });
    }

    let scale = f64_attribute(&var, "scale_factor").unwrap_or(1.0);
    let offset = f64_attribute(&var, "add_offset").unwrap_or(0.0);
    let fill = f64_attribute(&var, "_FillValue");
    let missing = f64_attribute(&var, "missing_value");

    let values: Vec<f64> = raw
        .into_iter()
        .map(|v| {
            if Some(v) == fill || Some(v) == missing || v.is_nan() {
                f64::NAN
            } else {
                v * scale + offset
            }
        })
        .collect();

    debug!(
        file = %path.display(),
        times = shape.0,
        latitudes = shape.1,
        longitudes = shape.2,
        "Loaded NetCDF file"
    );

    Ok(Grid {
        times,
        latitudes,
        longitudes,
        values: Array3::from_shape_vec(shape, values).map_err(|_| GridError::Shape {
            variable: value_col.to_string(),
            found: expected,
            expected,
        })?,
    })
}

fn variable<'f>(file: &'f netcdf::File, name: &str) -> Result<Variable<'f>, GridError> {
    file.variable(name)
        .ok_or_else(|| GridError::MissingVariable(name.to_string()))
}

/// Reads a numeric variable as `f64` whatever its stored type.
fn read_numeric(var: &Variable) -> Result<Vec<f64>, GridError> {
    if let Ok(values) = var.get_values::<f64, _>(..) {
        return Ok(values);
    }
    if let Ok(values) = var.get_values::<f32, _>(..) {
        return Ok(values.into_iter().map(f64::from).collect());
    }
    if let Ok(values) = var.get_values::<i64, _>(..) {
        return Ok(values.into_iter().map(|v| v as f64).collect());
    }
    if let Ok(values) = var.get_values::<i32, _>(..) {
        return Ok(values.into_iter().map(f64::from).collect());
    }

    let values = var.get_values::<i16, _>(..)?;
    Ok(values.into_iter().map(f64::from).collect())
}

fn has_attribute(var: &Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

fn f64_attribute(var: &Variable, name: &str) -> Option<f64> {
    if !has_attribute(var, name) {
        return None;
    }
    let value = var.attribute_value(name)?.ok()?;
    f64::try_from(value).ok()
}

fn read_times(var: &Variable) -> Result<Vec<NaiveDateTime>, GridError> {
    let units = if has_attribute(var, "units") {
        match var.attribute_value("units") {
            Some(Ok(AttributeValue::Str(units))) => units,
            _ => return Err(GridError::TimeUnits("<unreadable>".to_string())),
        }
    } else {
        "seconds since 1970-01-01".to_string()
    };

    let (step, epoch) = parse_time_units(&units)?;

    read_numeric(var)?
        .into_iter()
        .map(|offset| {
            offset_to_time(offset, step, epoch)
                .ok_or_else(|| GridError::TimeUnits(format!("{units} (offset {offset})")))
        })
        .collect()
}

/// `epoch + offset * step`, or `None` for a non-finite or unrepresentable time.
fn offset_to_time(offset: f64, step: Duration, epoch: NaiveDateTime) -> Option<NaiveDateTime> {
    let seconds = (offset * step.num_seconds() as f64).round();
    if !seconds.is_finite() || seconds.abs() >= i64::MAX as f64 {
        return None;
    }

    Duration::try_seconds(seconds as i64).and_then(|delta| epoch.checked_add_signed(delta))
}

/// Parses CF time units such as `hours since 1900-01-01 00:00:00.0`.
pub fn parse_time_units(units: &str) -> Result<(Duration, NaiveDateTime), GridError> {
    let invalid = || GridError::TimeUnits(units.to_string());

    let (step, reference) = units.split_once(" since ").ok_or_else(invalid)?;

    let step = match step.trim().to_lowercase().as_str() {
        "seconds" | "second" | "s" => Duration::seconds(1),
        "minutes" | "minute" | "min" => Duration::minutes(1),
        "hours" | "hour" | "h" => Duration::hours(1),
        "days" | "day" | "d" => Duration::days(1),
        _ => return Err(invalid()),
    };

    let reference = reference
        .trim()
        .trim_end_matches(" UTC")
        .trim_end_matches('Z');

    let epoch = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(reference, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(reference, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(invalid)?;

    Ok((step, epoch))
}

// -- Tests -------------------------------------------------------------------
