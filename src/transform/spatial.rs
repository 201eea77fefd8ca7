//! Grid to organisation unit reduction.

use geo::{BoundingRect, Intersects, Point};
use tracing::warn;

use super::{AggregatedValue, Statistic};
use crate::{grid::DailyGrid, region::Region};

/// Grid cells whose centre lies inside, or on the edge of, a region.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionMask {
    pub org_unit: String,
    pub cells: Vec<(usize, usize)>,
}

impl RegionMask {
    pub fn new(region: &Region, latitudes: &[f64], longitudes: &[f64]) -> Self {
        let Some(rect) = region.geometry.bounding_rect() else {
            return RegionMask {
                org_unit: region.id.clone(),
                cells: Vec::new(),
            };
        };

        let lat_range = rect.min().y..=rect.max().y;
        let lon_range = rect.min().x..=rect.max().x;

        let mut cells = Vec::new();
        for (i, lat) in latitudes.iter().enumerate() {
            if !lat_range.contains(lat) {
                continue;
            }
            for (j, lon) in longitudes.iter().enumerate() {
                if lon_range.contains(lon) && region.geometry.intersects(&Point::new(*lon, *lat)) {
                    cells.push((i, j));
                }
            }
        }

        RegionMask {
            org_unit: region.id.clone(),
            cells,
        }
    }
}

/// Reduces each day of the grid to one value per region.
///
/// Rows come out grouped by region, in the order the regions were given,
/// with dates ascending. A region covering no cell centre yields NaN.
pub fn reduce(grid: &DailyGrid, regions: &[Region], how: Statistic) -> Vec<AggregatedValue> {
    let masks: Vec<RegionMask> = regions
        .iter()
        .map(|r| RegionMask::new(r, &grid.latitudes, &grid.longitudes))
        .collect();

    let uncovered: Vec<&str> = masks
        .iter()
        .filter(|m| m.cells.is_empty())
        .map(|m| m.org_unit.as_str())
        .collect();
    if !uncovered.is_empty() {
        warn!(
            count = uncovered.len(),
            org_units = %uncovered.join(","),
            "Organisation units cover no grid cell centres"
        );
    }

    let mut rows = Vec::with_capacity(masks.len() * grid.times.len());
    for mask in &masks {
        for (t, date) in grid.times.iter().enumerate() {
            let samples = mask.cells.iter().map(|&(i, j)| grid.values[[t, i, j]]);
            rows.push(AggregatedValue {
                org_unit: mask.org_unit.clone(),
                date: *date,
                value: how.reduce(samples),
            });
        }
    }

    rows
}

// -- Tests -------------------------------------------------------------------
