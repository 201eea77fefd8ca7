//! Gridded timeseries held in memory between download and aggregation.

pub mod reader;

use chrono::{NaiveDate, NaiveDateTime};
use ndarray::{concatenate, Array3, Axis};
use thiserror::Error;

pub use reader::open_hourly;

#[derive(Error, Debug)]
pub enum GridError {
    #[error("Failed to read NetCDF file: {0}")]
    Netcdf(#[from] netcdf::Error),

    #[error("Missing variable `{0}`")]
    MissingVariable(String),

    #[error("Unsupported time units `{0}`")]
    TimeUnits(String),

    #[error("Variable `{variable}` has {found} values, expected {expected}")]
    Shape {
        variable: String,
        found: usize,
        expected: usize,
    },

    #[error("Files do not share the same latitude/longitude grid")]
    GridMismatch,

    #[error("No files to load")]
    Empty,
}

/// Values of one variable indexed by (time, latitude, longitude).
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    pub times: Vec<T>,
    pub latitudes: Vec<f64>,
    pub longitudes: Vec<f64>,
    pub values: Array3<f64>,
}

pub type HourlyGrid = Grid<NaiveDateTime>;
pub type DailyGrid = Grid<NaiveDate>;

impl<T> Grid<T> {
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

impl<T: Copy + Ord> Grid<T> {
    /// Joins grids along the time axis.
    ///
    /// Output is ordered by time; a timestamp present in several parts is
    /// kept once, from the first part that holds it.
    pub fn concat(parts: Vec<Grid<T>>) -> Result<Grid<T>, GridError> {
        let first = parts.first().ok_or(GridError::Empty)?;
        let (latitudes, longitudes) = (first.latitudes.clone(), first.longitudes.clone());

        if parts
            .iter()
            .any(|p| p.latitudes != latitudes || p.longitudes != longitudes)
        {
            return Err(GridError::GridMismatch);
        }

        let mut index: Vec<(T, usize, usize)> = parts
            .iter()
            .enumerate()
            .flat_map(|(p, part)| part.times.iter().enumerate().map(move |(i, t)| (*t, p, i)))
            .collect();
        index.sort();
        index.dedup_by_key(|(t, _, _)| *t);

        let slices: Vec<_> = index
            .iter()
            .map(|&(_, p, i)| parts[p].values.slice(ndarray::s![i..i + 1, .., ..]))
            .collect();

        let values = if slices.is_empty() {
            Array3::zeros((0, latitudes.len(), longitudes.len()))
        } else {
            concatenate(Axis(0), &slices).map_err(|_| GridError::GridMismatch)?
        };

        Ok(Grid {
            times: index.into_iter().map(|(t, _, _)| t).collect(),
            latitudes,
            longitudes,
            values,
        })
    }
}

// -- Tests -------------------------------------------------------------------
