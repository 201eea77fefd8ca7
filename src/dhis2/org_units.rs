//! Organisation unit boundaries from `/api/organisationUnits.geojson`.

use geo::{Geometry, MultiPolygon};
use geojson::{feature::Id, Feature, FeatureCollection};
use tracing::warn;

use super::Dhis2Error;
use crate::region::Region;

/// Parses the GeoJSON served by DHIS2 into regions.
///
/// Features without an id or without a polygonal geometry (facilities are
/// served as points) cannot be aggregated to and are skipped.
pub fn parse_regions(body: &str) -> Result<Vec<Region>, Dhis2Error> {
    let collection: FeatureCollection = body.parse()?;

    let mut regions = Vec::with_capacity(collection.features.len());
    let mut skipped = 0;

    for feature in collection.features {
        match to_region(feature) {
            Some(region) => regions.push(region),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!(skipped, "Skipped organisation units without polygon boundaries");
    }

    Ok(regions)
}

fn to_region(feature: Feature) -> Option<Region> {
    let id = feature_id(&feature)?;
    let name = feature
        .property("name")
        .and_then(|v| v.as_str())
        .map(str::to_string);

    let geometry = Geometry::<f64>::try_from(feature.geometry?.value).ok()?;
    let geometry = match geometry {
        Geometry::Polygon(polygon) => MultiPolygon::new(vec![polygon]),
        Geometry::MultiPolygon(multi) => multi,
        _ => return None,
    };

    Some(Region { id, name, geometry })
}

fn feature_id(feature: &Feature) -> Option<String> {
    match &feature.id {
        Some(Id::String(id)) => Some(id.clone()),
        Some(Id::Number(id)) => Some(id.to_string()),
        None => feature
            .property("id")
            .and_then(|v| v.as_str())
            .map(str::to_string),
    }
}

// -- Tests -------------------------------------------------------------------
