//! GeoJSON `FeatureCollection` files as feature classes.
//!
//! The legacy `crs` member is honoured on read and always written, so a class
//! that was projected keeps saying so on disk.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

use crate::features::feature::{Feature, FeatureClass, OID_FIELD};
use crate::features::geometry::{Geometry, Point, Polygon};
use crate::features::spatial_ref::SpatialReference;
use crate::prelude::{ToolError, ToolResult};

#[derive(Debug, Serialize, Deserialize)]
struct CollectionDoc {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    crs: Option<CrsDoc>,
    #[serde(default)]
    features: Vec<FeatureDoc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CrsDoc {
    #[serde(rename = "type")]
    kind: String,
    properties: CrsProperties,
}

#[derive(Debug, Serialize, Deserialize)]
struct CrsProperties {
    name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct FeatureDoc {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<Value>,
    geometry: Option<Value>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
enum GeometryDoc {
    Point { coordinates: Vec<f64> },
    Polygon { coordinates: Vec<Vec<Vec<f64>>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Vec<f64>>>> },
}

pub fn read_feature_class<P: AsRef<Path>>(path: P) -> ToolResult<FeatureClass> {
    let path_ref = path.as_ref();
    let contents = fs::read_to_string(path_ref)?;
    let name = path_ref
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "features".to_string());
    parse_feature_class(&contents, &name)
}

pub fn parse_feature_class(contents: &str, name: &str) -> ToolResult<FeatureClass> {
    let doc: CollectionDoc = serde_json::from_str(contents)?;
    if doc.kind != "FeatureCollection" {
        return Err(ToolError::InvalidParameter(format!(
            "'{}' is a {}, expected a FeatureCollection",
            name, doc.kind
        )));
    }

    let mut features = Vec::with_capacity(doc.features.len());
    for (index, feature_doc) in doc.features.into_iter().enumerate() {
        features.push(feature_from_doc(feature_doc, index)?);
    }

    let spatial_reference = match doc.crs {
        Some(crs) => SpatialReference::parse(&crs.properties.name)?,
        None => infer_spatial_reference(&features, name)?,
    };

    Ok(FeatureClass {
        name: doc.name.unwrap_or_else(|| name.to_string()),
        spatial_reference,
        features,
    })
}

fn feature_from_doc(doc: FeatureDoc, index: usize) -> ToolResult<Feature> {
    let attributes = doc.properties.unwrap_or_default();
    let oid = doc
        .id
        .as_ref()
        .and_then(Value::as_i64)
        .or_else(|| attributes.get(OID_FIELD).and_then(Value::as_i64))
        .unwrap_or(index as i64 + 1);

    let raw = doc.geometry.ok_or_else(|| {
        ToolError::UnsupportedGeometry(format!("feature {} has no geometry", oid))
    })?;
    let geometry = geometry_from_value(raw, oid)?;
    Ok(Feature::new(oid, geometry, attributes))
}

fn geometry_from_value(raw: Value, oid: i64) -> ToolResult<Geometry> {
    let kind = raw
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("<missing>")
        .to_string();
    if !matches!(kind.as_str(), "Point" | "Polygon" | "MultiPolygon") {
        return Err(ToolError::UnsupportedGeometry(format!(
            "feature {} has geometry type {}",
            oid, kind
        )));
    }

    let doc: GeometryDoc = serde_json::from_value(raw)?;
    match doc {
        GeometryDoc::Point { coordinates } => Ok(Geometry::Point(point_from(&coordinates, oid)?)),
        GeometryDoc::Polygon { coordinates } => Ok(Geometry::Polygon(polygon_from(&coordinates, oid)?)),
        GeometryDoc::MultiPolygon { coordinates } => coordinates
            .iter()
            .map(|rings| polygon_from(rings, oid))
            .collect::<ToolResult<Vec<_>>>()
            .map(Geometry::MultiPolygon),
    }
}

fn point_from(coords: &[f64], oid: i64) -> ToolResult<Point> {
    match coords {
        [x, y, ..] => Ok(Point::new(*x, *y)),
        _ => Err(ToolError::UnsupportedGeometry(format!(
            "feature {} has a position with fewer than two coordinates",
            oid
        ))),
    }
}

fn polygon_from(rings: &[Vec<Vec<f64>>], oid: i64) -> ToolResult<Polygon> {
    let rings = rings
        .iter()
        .map(|ring| ring.iter().map(|pos| point_from(pos, oid)).collect())
        .collect::<ToolResult<Vec<Vec<Point>>>>()?;
    if rings.first().map_or(true, |ring| ring.len() < 3) {
        return Err(ToolError::UnsupportedGeometry(format!(
            "feature {} has a polygon without a valid exterior ring",
            oid
        )));
    }
    Ok(Polygon::new(rings))
}

/// Data without a declared crs is assumed WGS84 when every coordinate lies
/// in lon/lat range.
fn infer_spatial_reference(features: &[Feature], name: &str) -> ToolResult<SpatialReference> {
    let in_range = features
        .iter()
        .flat_map(|feature| feature.geometry.points())
        .all(|p| p.x > -181.0 && p.x < 181.0 && p.y > -91.0 && p.y < 91.0);
    if in_range {
        Ok(SpatialReference::WGS84)
    } else {
        Err(ToolError::SpatialReference(format!(
            "'{}' has no crs and its coordinates are not lon/lat",
            name
        )))
    }
}

fn geometry_to_value(geometry: &Geometry) -> Value {
    let position = |p: &Point| vec![p.x, p.y];
    let rings = |poly: &Polygon| -> Vec<Vec<Vec<f64>>> {
        poly.rings
            .iter()
            .map(|ring| ring.iter().map(position).collect())
            .collect()
    };
    let doc = match geometry {
        Geometry::Point(p) => GeometryDoc::Point {
            coordinates: position(p),
        },
        Geometry::Polygon(poly) => GeometryDoc::Polygon {
            coordinates: rings(poly),
        },
        Geometry::MultiPolygon(parts) => GeometryDoc::MultiPolygon {
            coordinates: parts.iter().map(rings).collect(),
        },
    };
    serde_json::to_value(doc).unwrap_or(Value::Null)
}

pub fn to_geojson_string(fc: &FeatureClass) -> ToolResult<String> {
    let doc = CollectionDoc {
        kind: "FeatureCollection".to_string(),
        name: Some(fc.name.clone()),
        crs: Some(CrsDoc {
            kind: "name".to_string(),
            properties: CrsProperties {
                name: fc.spatial_reference.urn(),
            },
        }),
        features: fc
            .features
            .iter()
            .map(|feature| FeatureDoc {
                kind: "Feature".to_string(),
                id: Some(Value::from(feature.oid)),
                geometry: Some(geometry_to_value(&feature.geometry)),
                properties: Some(feature.attributes.clone()),
            })
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

pub fn write_feature_class<P: AsRef<Path>>(fc: &FeatureClass, path: P) -> ToolResult<()> {
    let path_ref = path.as_ref();
    if let Some(parent) = path_ref.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path_ref, to_geojson_string(fc)?)?;
    Ok(())
}
