//! Organisation units with their boundaries.

use geo::{BoundingRect, MultiPolygon};

/// An organisation unit used as a spatial aggregation target.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub id: String,
    pub name: Option<String>,
    pub geometry: MultiPolygon<f64>,
}

/// Geographic extent in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    /// Smallest box enclosing every region, or `None` without geometries.
    pub fn enclosing(regions: &[Region]) -> Option<Self> {
        regions
            .iter()
            .filter_map(|r| r.geometry.bounding_rect())
            .map(|rect| BoundingBox {
                west: rect.min().x,
                south: rect.min().y,
                east: rect.max().x,
                north: rect.max().y,
            })
            .reduce(|a, b| BoundingBox {
                west: a.west.min(b.west),
                south: a.south.min(b.south),
                east: a.east.max(b.east),
                north: a.north.max(b.north),
            })
    }

    /// Expands the box outward to the nearest multiples of `step` degrees.
    pub fn snapped(&self, step: f64) -> Self {
        let down = |v: f64| round_to(v / step, 6).floor() * step;
        let up = |v: f64| round_to(v / step, 6).ceil() * step;

        BoundingBox {
            west: round_to(down(self.west), 6),
            south: round_to(down(self.south), 6),
            east: round_to(up(self.east), 6),
            north: round_to(up(self.north), 6),
        }
    }

    /// The box as a CDS `area`: north, west, south, east.
    pub fn area(&self) -> [f64; 4] {
        [self.north, self.west, self.south, self.east]
    }
}

fn round_to(v: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (v * factor).round() / factor
}

// -- Tests -------------------------------------------------------------------
