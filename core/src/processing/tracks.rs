use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;

use crate::features::time::parse_field_time;
use crate::features::{Feature, FeatureClass, Point};
use crate::prelude::{ToolError, ToolResult};

/// One observation of a track: the source feature, its location in the
/// working projection and its time.
#[derive(Debug, Clone)]
pub struct TrackPoint {
    pub source: Feature,
    pub location: Point,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Track {
    pub id: String,
    pub points: Vec<TrackPoint>,
}

impl Track {
    /// Consecutive point pairs in time order.
    pub fn segments(&self) -> impl Iterator<Item = (&TrackPoint, &TrackPoint)> {
        self.points.iter().zip(self.points.iter().skip(1))
    }
}

pub(crate) fn key_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Splits point features into tracks by `id_field`, in order of first
/// appearance. `source` supplies the attributes and original geometry,
/// `projected` the matching geometry in the working projection; both must
/// list the same features in the same order. Within a track, points sharing a
/// timestamp keep only the first, and the rest are sorted by time.
pub fn group_tracks(
    source: &FeatureClass,
    projected: &FeatureClass,
    id_field: &str,
    time_field: &str,
) -> ToolResult<Vec<Track>> {
    if source.len() != projected.len() {
        return Err(ToolError::Internal(
            "projected tracks do not match their source".into(),
        ));
    }

    let mut order: HashMap<String, usize> = HashMap::new();
    let mut tracks: Vec<Track> = Vec::new();

    for (feature, projected_feature) in source.features.iter().zip(&projected.features) {
        let location = *projected_feature.geometry.as_point().ok_or_else(|| {
            ToolError::UnsupportedGeometry(format!("track feature {} is not a point", feature.oid))
        })?;
        let raw_time = feature.value(time_field);
        let time = parse_field_time(&raw_time).ok_or_else(|| {
            ToolError::InvalidParameter(format!(
                "track feature {} has an unreadable time '{}' in field '{}'",
                feature.oid, raw_time, time_field
            ))
        })?;
        let id = key_string(&feature.value(id_field));

        let slot = *order.entry(id.clone()).or_insert_with(|| {
            tracks.push(Track {
                id,
                points: Vec::new(),
            });
            tracks.len() - 1
        });
        let track = &mut tracks[slot];
        if track.points.iter().any(|p| p.time == time) {
            continue;
        }
        track.points.push(TrackPoint {
            source: feature.clone(),
            location,
            time,
        });
    }

    for track in &mut tracks {
        track.points.sort_by_key(|p| p.time);
    }
    Ok(tracks)
}
