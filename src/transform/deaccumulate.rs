//! Turns running totals into per-interval increments.

use ndarray::{s, Zip};

use crate::grid::Grid;

/// De-accumulates a cumulative field along its time axis.
///
/// Each output step is the difference to the previous reading. Where that
/// difference is negative the accumulator was reset, and the raw reading at
/// the later timestamp is the increment instead. The first timestamp has no
/// predecessor and is dropped.
pub fn deaccumulate<T: Clone>(grid: &Grid<T>) -> Grid<T> {
    let steps = grid.times.len().saturating_sub(1);
    let earlier = grid.values.slice(s![..steps, .., ..]);
    let later = grid.values.slice(s![grid.times.len() - steps.., .., ..]);

    let values = Zip::from(earlier)
        .and(later)
        .map_collect(|&before, &after| {
            let diff = after - before;
            if diff < 0.0 {
                after
            } else {
                diff
            }
        });

    Grid {
        times: grid.times.iter().skip(1).cloned().collect(),
        latitudes: grid.latitudes.clone(),
        longitudes: grid.longitudes.clone(),
        values,
    }
}

// -- Tests -------------------------------------------------------------------
