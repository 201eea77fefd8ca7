//! Hourly to daily reduction.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use ndarray::{Array3, Axis};

use super::Statistic;
use crate::grid::{DailyGrid, HourlyGrid};

/// Collapses hourly samples into one value per day and grid cell.
///
/// Timestamps are shifted by `offset_hours` before they are bucketed, so a
/// positive offset assigns late UTC hours to the following local day. Days
/// with fewer than 24 samples are kept.
pub fn daily_reduce(grid: &HourlyGrid, how: Statistic, offset_hours: i32) -> DailyGrid {
    let shift = Duration::hours(i64::from(offset_hours));

    let mut days: BTreeMap<NaiveDate, Vec<usize>> = BTreeMap::new();
    for (i, time) in grid.times.iter().enumerate() {
        days.entry((*time + shift).date()).or_default().push(i);
    }

    let (n_lat, n_lon) = (grid.latitudes.len(), grid.longitudes.len());
    let mut values = Array3::from_elem((days.len(), n_lat, n_lon), f64::NAN);

    for (mut out, hours) in values.axis_iter_mut(Axis(0)).zip(days.values()) {
        let samples = grid.values.select(Axis(0), hours);
        for ((lat, lon), cell) in out.indexed_iter_mut() {
            *cell = how.reduce(samples.slice(ndarray::s![.., lat, lon]).iter().copied());
        }
    }

    DailyGrid {
        times: days.into_keys().collect(),
        latitudes: grid.latitudes.clone(),
        longitudes: grid.longitudes.clone(),
        values,
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn hourly(start: &str, values: &[f64]) -> HourlyGrid {
        let start = NaiveDateTime::parse_from_str(start, "%Y-%m-%d %H:%M").unwrap();
        HourlyGrid {
            times: (0..values.len())
                .map(|h| start + Duration::hours(h as i64))
                .collect(),
            latitudes: vec![0.0],
            longitudes: vec![0.0],
            values: Array3::from_shape_vec((values.len(), 1, 1), values.to_vec()).unwrap(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn should_sum_hours_into_days() {
        let grid = hourly("2025-01-01 00:00", &[1.0; 48]);
        let daily = daily_reduce(&grid, Statistic::Sum, 0);

        assert_eq!(daily.times, vec![date(2025, 1, 1), date(2025, 1, 2)]);
        assert_eq!(daily.values[[0, 0, 0]], 24.0);
        assert_eq!(daily.values[[1, 0, 0]], 24.0);
    }

    #[test]
    fn should_keep_partial_trailing_day() {
        let grid = hourly("2025-01-01 00:00", &[2.0; 30]);
        let daily = daily_reduce(&grid, Statistic::Mean, 0);

        assert_eq!(daily.times.len(), 2);
        assert_eq!(daily.values[[1, 0, 0]], 2.0);
    }

    #[test]
    fn should_shift_hours_into_local_day() {
        // 22:00 and 23:00 UTC fall on the next day at UTC+3
        let grid = hourly("2025-01-01 22:00", &[1.0, 2.0, 3.0]);
        let daily = daily_reduce(&grid, Statistic::Sum, 3);

        assert_eq!(daily.times, vec![date(2025, 1, 2)]);
        assert_eq!(daily.values[[0, 0, 0]], 6.0);
    }

    #[test]
    fn should_shift_hours_back_for_negative_offset() {
        let grid = hourly("2025-01-02 00:00", &[1.0, 2.0, 3.0]);
        let daily = daily_reduce(&grid, Statistic::Max, -2);

        assert_eq!(daily.times, vec![date(2025, 1, 1), date(2025, 1, 2)]);
        assert_eq!(daily.values[[0, 0, 0]], 2.0);
        assert_eq!(daily.values[[1, 0, 0]], 3.0);
    }

    #[test]
    fn should_return_empty_grid_without_samples() {
        let grid = hourly("2025-01-01 00:00", &[]);
        let daily = daily_reduce(&grid, Statistic::Sum, 0);

        assert!(daily.is_empty());
    }
}
