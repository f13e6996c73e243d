use crate::features::{Envelope, FeatureClass, Point, SpatialReference};
use crate::prelude::{ToolError, ToolResult};

const EARTH_RADIUS_M: f64 = 6_378_137.0;
const MAX_MERCATOR_LAT: f64 = 85.051_128_78;

fn lonlat_to_mercator(p: &Point) -> Point {
    let lat = p.y.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
    let x = EARTH_RADIUS_M * p.x.to_radians();
    let y = EARTH_RADIUS_M * (std::f64::consts::FRAC_PI_4 + lat / 2.0).tan().ln();
    Point::new(x, y)
}

fn mercator_to_lonlat(p: &Point) -> Point {
    let lon = (p.x / EARTH_RADIUS_M).to_degrees();
    let lat = (2.0 * (p.y / EARTH_RADIUS_M).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
    Point::new(lon, lat)
}

fn identity(p: &Point) -> Point {
    *p
}

/// Returns the point transform between two spatial references.
fn transform_for(
    from: SpatialReference,
    to: SpatialReference,
) -> ToolResult<fn(&Point) -> Point> {
    if from == to {
        return Ok(identity);
    }
    match (from, to) {
        (SpatialReference::WGS84, SpatialReference::WEB_MERCATOR) => Ok(lonlat_to_mercator),
        (SpatialReference::WEB_MERCATOR, SpatialReference::WGS84) => Ok(mercator_to_lonlat),
        _ => Err(ToolError::SpatialReference(format!(
            "no transformation from {} to {}",
            from, to
        ))),
    }
}

pub fn project_point(p: &Point, from: SpatialReference, to: SpatialReference) -> ToolResult<Point> {
    Ok(transform_for(from, to)?(p))
}

/// Projects all four corners so the result still bounds the source extent.
pub fn project_envelope(
    env: &Envelope,
    from: SpatialReference,
    to: SpatialReference,
) -> ToolResult<Envelope> {
    let transform = transform_for(from, to)?;
    let corners: Vec<Point> = env.corners().iter().map(transform).collect();
    Envelope::from_points(&corners)
        .ok_or_else(|| ToolError::Internal("envelope without corners".into()))
}

/// Returns a copy of the feature class in `to`.
pub fn project_feature_class(fc: &FeatureClass, to: SpatialReference) -> ToolResult<FeatureClass> {
    let transform = transform_for(fc.spatial_reference, to)?;
    let mut projected = fc.clone();
    projected.spatial_reference = to;
    for feature in &mut projected.features {
        feature.geometry = feature.geometry.map_points(transform);
    }
    Ok(projected)
}
