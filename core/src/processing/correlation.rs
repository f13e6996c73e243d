//! Space-time correlation of point tracks with polygon detections.
//!
//! Distances are measured in Web Mercator, so the tolerance is in that
//! projection's metres. Candidates are collected per track in parallel and
//! then joined one-to-one back onto the detections.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::features::time::{parse_field_time, seconds_between};
use crate::features::{
    read_feature_class, write_feature_class, FeatureClass, Geometry, GeometryKind,
    SpatialReference, OID_FIELD,
};
use crate::math::projection::project_feature_class;
use crate::prelude::{
    check_output, GeoprocessingTool, ToolEnvironment, ToolError, ToolMessages, ToolResult,
};
use crate::processing::join::{join_one_to_one, JoinSpec};
use crate::processing::tracks::{group_tracks, key_string, Track};
use crate::telemetry::{MetricsRecorder, Progressor};

pub const DEFAULT_DISTANCE_TOLERANCE: f64 = 800.0;
pub const DETECTION_OID_FIELD: &str = "detection_oid";
pub const NEAR_DIST_FIELD: &str = "near_dist";
pub const CANDIDATE_TABLE_NAME: &str = "match_candidates";

/// Temporal test applied on top of the spatial tolerance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemporalMode {
    /// A track segment passes near the detection while its end points
    /// straddle the detection time.
    #[default]
    Bracketing,
    /// Spatial proximity of individual points only.
    Proximity,
    /// Point proximity plus a maximum time offset.
    Window,
}

impl FromStr for TemporalMode {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bracketing" => Ok(TemporalMode::Bracketing),
            "proximity" => Ok(TemporalMode::Proximity),
            "window" => Ok(TemporalMode::Window),
            other => Err(ToolError::InvalidParameter(format!(
                "unknown temporal mode '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for TemporalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TemporalMode::Bracketing => "bracketing",
            TemporalMode::Proximity => "proximity",
            TemporalMode::Window => "window",
        };
        f.write_str(name)
    }
}

fn default_id_field() -> String {
    OID_FIELD.to_string()
}

fn default_tolerance() -> f64 {
    DEFAULT_DISTANCE_TOLERANCE
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpaceTimeParams {
    pub detections: PathBuf,
    #[serde(default = "default_id_field")]
    pub detection_id_field: String,
    pub detection_time_field: String,
    pub tracks: PathBuf,
    pub track_id_field: String,
    pub track_time_field: String,
    pub output: PathBuf,
    #[serde(default = "default_tolerance")]
    pub distance_tolerance: f64,
    #[serde(default)]
    pub temporal: TemporalMode,
    #[serde(default)]
    pub time_window_secs: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpaceTimeSummary {
    pub output: PathBuf,
    pub candidate_table: PathBuf,
    pub detections: usize,
    pub tracks: usize,
    pub candidates: usize,
    pub matched_detections: usize,
    pub messages: ToolMessages,
}

/// A track point linked to a detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub detection: usize,
    pub track: usize,
    pub point: usize,
    pub distance: f64,
}

/// A detection prepared for matching.
pub struct DetectionTarget {
    pub geometry: Geometry,
    pub time: Option<DateTime<Utc>>,
}

/// Matching rules for one run.
#[derive(Debug, Clone, Copy)]
pub struct MatchCriteria {
    pub tolerance: f64,
    pub temporal: TemporalMode,
    pub window_secs: f64,
}

impl MatchCriteria {
    /// Candidates contributed by one track.
    pub fn match_track(
        &self,
        track_index: usize,
        track: &Track,
        detections: &[DetectionTarget],
    ) -> Vec<Candidate> {
        match self.temporal {
            TemporalMode::Bracketing => self.match_bracketing(track_index, track, detections),
            TemporalMode::Proximity | TemporalMode::Window => {
                self.match_points(track_index, track, detections)
            }
        }
    }

    /// The first detection (in input order) that one of the track's segments
    /// passes within tolerance of while straddling its time claims the whole
    /// track.
    fn match_bracketing(
        &self,
        track_index: usize,
        track: &Track,
        detections: &[DetectionTarget],
    ) -> Vec<Candidate> {
        for (detection_index, detection) in detections.iter().enumerate() {
            let Some(timestamp) = detection.time else {
                continue;
            };
            let hit = track.segments().any(|(a, b)| {
                a.time < timestamp
                    && b.time > timestamp
                    && detection.geometry.distance_to_segment(&a.location, &b.location)
                        <= self.tolerance
            });
            if hit {
                return track
                    .points
                    .iter()
                    .enumerate()
                    .map(|(point, p)| Candidate {
                        detection: detection_index,
                        track: track_index,
                        point,
                        distance: detection.geometry.distance_to_point(&p.location),
                    })
                    .collect();
            }
        }
        Vec::new()
    }

    fn match_points(
        &self,
        track_index: usize,
        track: &Track,
        detections: &[DetectionTarget],
    ) -> Vec<Candidate> {
        let mut out = Vec::new();
        for (detection_index, detection) in detections.iter().enumerate() {
            for (point, p) in track.points.iter().enumerate() {
                if self.temporal == TemporalMode::Window {
                    let within = detection
                        .time
                        .map(|t| seconds_between(&t, &p.time).abs() <= self.window_secs)
                        .unwrap_or(false);
                    if !within {
                        continue;
                    }
                }
                let distance = detection.geometry.distance_to_point(&p.location);
                if distance <= self.tolerance {
                    out.push(Candidate {
                        detection: detection_index,
                        track: track_index,
                        point,
                        distance,
                    });
                }
            }
        }
        out
    }
}

/// Correlates point tracks with polygon detections in space and time and
/// writes the detections joined with their best candidate.
pub struct SpaceTimeCorrelation {
    env: ToolEnvironment,
    params: Option<SpaceTimeParams>,
    metrics: MetricsRecorder,
}

impl SpaceTimeCorrelation {
    pub fn new(env: ToolEnvironment) -> Self {
        Self {
            env,
            params: None,
            metrics: MetricsRecorder::new(),
        }
    }

    fn criteria(params: &SpaceTimeParams) -> MatchCriteria {
        MatchCriteria {
            tolerance: params.distance_tolerance,
            temporal: params.temporal,
            window_secs: params.time_window_secs.unwrap_or(0.0),
        }
    }
}

fn candidate_table(
    tracks_fc: &FeatureClass,
    tracks: &[Track],
    detection_keys: &[Value],
    candidates: &[Candidate],
) -> FeatureClass {
    let mut table = FeatureClass::new(CANDIDATE_TABLE_NAME, tracks_fc.spatial_reference);
    for (index, candidate) in candidates.iter().enumerate() {
        let mut row = tracks[candidate.track].points[candidate.point].source.clone();
        row.oid = index as i64 + 1;
        row.set_field(
            DETECTION_OID_FIELD,
            detection_keys[candidate.detection].clone(),
        );
        row.set_field(NEAR_DIST_FIELD, Value::from(candidate.distance));
        table.features.push(row);
    }
    table
}

impl GeoprocessingTool for SpaceTimeCorrelation {
    type Params = SpaceTimeParams;
    type Output = SpaceTimeSummary;

    fn name(&self) -> &'static str {
        "SpaceTimeCorrelation"
    }

    fn initialize(&mut self, params: SpaceTimeParams) -> ToolResult<()> {
        if !(params.distance_tolerance.is_finite() && params.distance_tolerance > 0.0) {
            return Err(ToolError::InvalidParameter(format!(
                "distance tolerance must be positive, got {}",
                params.distance_tolerance
            )));
        }
        if params.temporal == TemporalMode::Window {
            match params.time_window_secs {
                Some(secs) if secs.is_finite() && secs >= 0.0 => {}
                other => {
                    return Err(ToolError::InvalidParameter(format!(
                        "window mode needs a non-negative time window, got {:?}",
                        other
                    )))
                }
            }
        }
        for (label, field) in [
            ("detection id", &params.detection_id_field),
            ("detection time", &params.detection_time_field),
            ("track id", &params.track_id_field),
            ("track time", &params.track_time_field),
        ] {
            if field.trim().is_empty() {
                return Err(ToolError::InvalidParameter(format!(
                    "{} field must be named",
                    label
                )));
            }
        }
        self.params = Some(params);
        Ok(())
    }

    fn execute(&mut self, progress: &Progressor) -> ToolResult<SpaceTimeSummary> {
        let params = self
            .params
            .clone()
            .ok_or_else(|| ToolError::Internal("tool not initialized".into()))?;
        check_output(&params.output, &self.env)?;
        let mut messages = ToolMessages::default();

        let detections_fc = read_feature_class(&params.detections)?;
        detections_fc.require_kind(GeometryKind::Polygon)?;
        detections_fc.require_field(&params.detection_id_field)?;
        detections_fc.require_field(&params.detection_time_field)?;

        let tracks_fc = read_feature_class(&params.tracks)?;
        tracks_fc.require_kind(GeometryKind::Point)?;
        tracks_fc.require_field(&params.track_id_field)?;
        tracks_fc.require_field(&params.track_time_field)?;

        progress.set_label("Projecting inputs...");
        let projected_detections =
            project_feature_class(&detections_fc, SpatialReference::WEB_MERCATOR)?;
        let projected_tracks = project_feature_class(&tracks_fc, SpatialReference::WEB_MERCATOR)?;

        let tracks = group_tracks(
            &tracks_fc,
            &projected_tracks,
            &params.track_id_field,
            &params.track_time_field,
        )?;

        let mut detection_keys = Vec::with_capacity(detections_fc.len());
        let mut targets = Vec::with_capacity(detections_fc.len());
        let mut seen_keys = HashSet::new();
        for (feature, projected) in detections_fc
            .features
            .iter()
            .zip(&projected_detections.features)
        {
            let key = feature.value(&params.detection_id_field);
            if !seen_keys.insert(key_string(&key)) {
                messages.warn(format!(
                    "detection id {} is not unique; joins for it are ambiguous",
                    key
                ));
            }
            let time = parse_field_time(&feature.value(&params.detection_time_field));
            if time.is_none() && params.temporal != TemporalMode::Proximity {
                messages.warn(format!(
                    "detection {} has no readable time and cannot be matched",
                    feature.oid
                ));
            }
            detection_keys.push(key);
            targets.push(DetectionTarget {
                geometry: projected.geometry.clone(),
                time,
            });
        }

        let criteria = Self::criteria(&params);
        let done = AtomicUsize::new(0);
        let total = tracks.len();
        let per_track: Vec<Vec<Candidate>> = tracks
            .par_iter()
            .enumerate()
            .map(|(index, track)| {
                let found = criteria.match_track(index, track, &targets);
                let finished = done.fetch_add(1, Ordering::Relaxed);
                progress.step("Evaluating track", finished, total);
                if found.is_empty() {
                    self.metrics.record_skipped();
                } else {
                    self.metrics.record_processed();
                }
                found
            })
            .collect();
        let candidates: Vec<Candidate> = per_track.into_iter().flatten().collect();

        if candidates.is_empty() {
            self.metrics.record_error();
            log::error!(
                "no tracks matched any of {} detections within {}",
                targets.len(),
                params.distance_tolerance
            );
            return Err(ToolError::NoCandidates);
        }

        let table = candidate_table(&tracks_fc, &tracks, &detection_keys, &candidates);
        let scratch = self.env.ensure_scratch()?;
        let candidate_path = scratch.join(format!("{}.geojson", CANDIDATE_TABLE_NAME));
        write_feature_class(&table, &candidate_path)?;

        progress.set_label("Joining candidates to detections...");
        let carry = [
            params.track_id_field.as_str(),
            params.track_time_field.as_str(),
            NEAR_DIST_FIELD,
        ];
        let spec = JoinSpec {
            key_field: DETECTION_OID_FIELD,
            distance_field: NEAR_DIST_FIELD,
            carry_fields: &carry,
        };
        let output_name = params
            .output
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "correlated".to_string());
        let joined = join_one_to_one(&detections_fc, &detection_keys, &table, &spec, &output_name);
        write_feature_class(&joined, &params.output)?;
        progress.set_position(100);

        let matched_detections = candidates
            .iter()
            .map(|c| c.detection)
            .collect::<HashSet<_>>()
            .len();
        messages.note(format!(
            "{} candidates from {} tracks matched {} of {} detections",
            candidates.len(),
            self.metrics.snapshot().processed,
            matched_detections,
            targets.len()
        ));
        progress.record(&format!(
            "{} finished: {} candidates",
            self.name(),
            candidates.len()
        ));

        Ok(SpaceTimeSummary {
            output: params.output.clone(),
            candidate_table: candidate_path,
            detections: targets.len(),
            tracks: total,
            candidates: candidates.len(),
            matched_detections,
            messages,
        })
    }

    fn cleanup(&mut self) {
        self.params = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{Envelope, Feature, Point, Polygon};
    use crate::processing::join::JOIN_COUNT_FIELD;
    use crate::processing::tracks::TrackPoint;
    use chrono::TimeZone;
    use serde_json::{json, Map};
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_600_000_000 + secs, 0).unwrap()
    }

    fn track(points: &[(f64, f64, i64)]) -> Track {
        Track {
            id: "t".into(),
            points: points
                .iter()
                .map(|&(x, y, secs)| TrackPoint {
                    source: Feature::new(0, Geometry::Point(Point::new(x, y)), Map::new()),
                    location: Point::new(x, y),
                    time: at(secs),
                })
                .collect(),
        }
    }

    fn target(min: f64, max: f64, secs: i64) -> DetectionTarget {
        DetectionTarget {
            geometry: Geometry::Polygon(Polygon::from_envelope(&Envelope::new(min, min, max, max))),
            time: Some(at(secs)),
        }
    }

    fn criteria(temporal: TemporalMode) -> MatchCriteria {
        MatchCriteria {
            tolerance: 10.0,
            temporal,
            window_secs: 30.0,
        }
    }

    #[test]
    fn bracketing_needs_segment_near_detection_at_detection_time() {
        // passes 5 units from the box between t=0 and t=100
        let t = track(&[(-50.0, 105.0, 0), (150.0, 105.0, 100), (300.0, 300.0, 200)]);
        let on_time = [target(0.0, 100.0, 50)];
        let late = [target(0.0, 100.0, 150)];

        let found = criteria(TemporalMode::Bracketing).match_track(0, &t, &on_time);
        assert_eq!(found.len(), 3);
        assert!(found.iter().all(|c| c.detection == 0));

        assert!(criteria(TemporalMode::Bracketing)
            .match_track(0, &t, &late)
            .is_empty());
    }

    #[test]
    fn bracketing_uses_strict_time_bounds() {
        let t = track(&[(-50.0, 50.0, 0), (150.0, 50.0, 100)]);
        let at_start = [target(0.0, 100.0, 0)];
        assert!(criteria(TemporalMode::Bracketing)
            .match_track(0, &t, &at_start)
            .is_empty());
    }

    #[test]
    fn bracketing_assigns_track_to_first_detection_only() {
        let t = track(&[(-50.0, 50.0, 0), (500.0, 50.0, 100)]);
        let detections = [target(0.0, 100.0, 50), target(200.0, 300.0, 50)];
        let found = criteria(TemporalMode::Bracketing).match_track(0, &t, &detections);
        assert!(!found.is_empty());
        assert!(found.iter().all(|c| c.detection == 0));
    }

    #[test]
    fn proximity_ignores_time_and_window_enforces_it() {
        let t = track(&[(105.0, 50.0, 0), (200.0, 50.0, 10), (50.0, 50.0, 1000)]);
        let detections = [target(0.0, 100.0, 0)];

        let proximity = criteria(TemporalMode::Proximity).match_track(0, &t, &detections);
        let points: Vec<usize> = proximity.iter().map(|c| c.point).collect();
        assert_eq!(points, vec![0, 2]);
        assert_eq!(proximity[0].distance, 5.0);

        let window = criteria(TemporalMode::Window).match_track(0, &t, &detections);
        let points: Vec<usize> = window.iter().map(|c| c.point).collect();
        assert_eq!(points, vec![0]);
    }

    // Detections in lon/lat near the equator; one degree is ~111 km there.
    const DETECTIONS: &str = r#"{"type": "FeatureCollection", "features": [
        {"type": "Feature", "id": 1, "properties": {"det_time": "2021-06-01T12:00:00Z"},
         "geometry": {"type": "Polygon", "coordinates": [[[0,0],[0.001,0],[0.001,0.001],[0,0.001],[0,0]]]}},
        {"type": "Feature", "id": 2, "properties": {"det_time": "2021-06-01T12:00:00Z"},
         "geometry": {"type": "Polygon", "coordinates": [[[1,1],[1.001,1],[1.001,1.001],[1,1.001],[1,1]]]}}
    ]}"#;

    const TRACKS: &str = r#"{"type": "FeatureCollection", "features": [
        {"type": "Feature", "geometry": {"type": "Point", "coordinates": [-0.01, 0.0005]}, "properties": {"mmsi": 111, "ts": "2021-06-01T11:55:00Z"}},
        {"type": "Feature", "geometry": {"type": "Point", "coordinates": [0.01, 0.0005]}, "properties": {"mmsi": 111, "ts": "2021-06-01T12:05:00Z"}},
        {"type": "Feature", "geometry": {"type": "Point", "coordinates": [0.5, 0.5]}, "properties": {"mmsi": 222, "ts": "2021-06-01T11:00:00Z"}},
        {"type": "Feature", "geometry": {"type": "Point", "coordinates": [0.6, 0.5]}, "properties": {"mmsi": 222, "ts": "2021-06-01T13:00:00Z"}}
    ]}"#;

    fn fixture() -> (TempDir, SpaceTimeParams, ToolEnvironment) {
        let dir = tempdir().unwrap();
        let detections = dir.path().join("detections.geojson");
        let tracks = dir.path().join("tracks.geojson");
        fs::write(&detections, DETECTIONS).unwrap();
        fs::write(&tracks, TRACKS).unwrap();
        let params = SpaceTimeParams {
            detections,
            detection_id_field: OID_FIELD.into(),
            detection_time_field: "det_time".into(),
            tracks,
            track_id_field: "mmsi".into(),
            track_time_field: "ts".into(),
            output: dir.path().join("out").join("correlated.geojson"),
            distance_tolerance: DEFAULT_DISTANCE_TOLERANCE,
            temporal: TemporalMode::Bracketing,
            time_window_secs: None,
        };
        let env = ToolEnvironment {
            scratch_folder: dir.path().join("scratch"),
            overwrite_output: false,
        };
        (dir, params, env)
    }

    #[test]
    fn correlation_joins_matching_track_onto_detection() {
        let (_dir, params, env) = fixture();
        let output = params.output.clone();
        let mut tool = SpaceTimeCorrelation::new(env);
        tool.initialize(params).unwrap();
        let summary = tool.execute(&Progressor::new()).unwrap();
        tool.cleanup();

        assert_eq!(summary.tracks, 2);
        assert_eq!(summary.candidates, 2);
        assert_eq!(summary.matched_detections, 1);
        assert!(summary.candidate_table.exists());

        let joined = read_feature_class(&output).unwrap();
        assert_eq!(joined.len(), 2);
        assert_eq!(joined.spatial_reference, SpatialReference::WGS84);
        let first = &joined.features[0].attributes;
        assert_eq!(first[JOIN_COUNT_FIELD], json!(2));
        assert_eq!(first["mmsi"], json!(111));
        assert_eq!(first["det_time"], json!("2021-06-01T12:00:00Z"));
        let second = &joined.features[1].attributes;
        assert_eq!(second[JOIN_COUNT_FIELD], json!(0));
        assert!(second["mmsi"].is_null());

        let candidates = read_feature_class(&summary.candidate_table).unwrap();
        assert!(candidates
            .features
            .iter()
            .all(|f| f.attributes[DETECTION_OID_FIELD] == json!(1)));
    }

    #[test]
    fn no_candidates_is_an_error_and_writes_nothing() {
        let (_dir, mut params, env) = fixture();
        params.distance_tolerance = 1.0;
        params.temporal = TemporalMode::Proximity;
        let output = params.output.clone();
        let mut tool = SpaceTimeCorrelation::new(env);
        tool.initialize(params).unwrap();
        assert!(matches!(
            tool.execute(&Progressor::new()),
            Err(ToolError::NoCandidates)
        ));
        assert!(!output.exists());
    }

    #[test]
    fn invalid_parameters_are_rejected_at_initialize() {
        let (_dir, mut params, env) = fixture();
        let mut tool = SpaceTimeCorrelation::new(env);

        params.distance_tolerance = 0.0;
        assert!(tool.initialize(params.clone()).is_err());

        params.distance_tolerance = 800.0;
        params.temporal = TemporalMode::Window;
        assert!(tool.initialize(params.clone()).is_err());

        params.time_window_secs = Some(60.0);
        assert!(tool.initialize(params).is_ok());
    }

    #[test]
    fn missing_time_field_is_reported() {
        let (_dir, mut params, env) = fixture();
        params.detection_time_field = "when".into();
        let mut tool = SpaceTimeCorrelation::new(env);
        tool.initialize(params).unwrap();
        assert!(matches!(
            tool.execute(&Progressor::new()),
            Err(ToolError::FieldNotFound(_))
        ));
    }

    const SPARSE_DETECTIONS: &str = r#"{"type": "FeatureCollection", "features": [
        {"type": "Feature", "id": 1, "properties": {"code": "A", "det_time": "2021-06-01T12:00:00Z"},
         "geometry": {"type": "Polygon", "coordinates": [[[0,0],[0.001,0],[0.001,0.001],[0,0.001],[0,0]]]}},
        {"type": "Feature", "id": 2, "properties": {},
         "geometry": {"type": "Polygon", "coordinates": [[[1,1],[1.001,1],[1.001,1.001],[1,1.001],[1,1]]]}},
        {"type": "Feature", "id": 3, "properties": {"code": "A", "det_time": "around noon"},
         "geometry": {"type": "Polygon", "coordinates": [[[2,2],[2.001,2],[2.001,2.001],[2,2.001],[2,2]]]}}
    ]}"#;

    #[test]
    fn detections_without_readable_time_are_warned_and_skipped() {
        let (_dir, params, env) = fixture();
        fs::write(&params.detections, SPARSE_DETECTIONS).unwrap();
        let output = params.output.clone();
        let mut tool = SpaceTimeCorrelation::new(env);
        tool.initialize(params).unwrap();
        let summary = tool.execute(&Progressor::new()).unwrap();

        let warnings = &summary.messages.warnings;
        assert!(warnings
            .iter()
            .any(|w| w.contains("detection 2 has no readable time")));
        assert!(warnings
            .iter()
            .any(|w| w.contains("detection 3 has no readable time")));
        assert_eq!(summary.matched_detections, 1);

        let joined = read_feature_class(&output).unwrap();
        assert_eq!(joined.len(), 3);
        assert_eq!(joined.features[1].attributes[JOIN_COUNT_FIELD], json!(0));
    }

    #[test]
    fn duplicate_detection_ids_are_warned() {
        let (_dir, mut params, env) = fixture();
        fs::write(&params.detections, SPARSE_DETECTIONS).unwrap();
        params.detection_id_field = "code".into();
        let mut tool = SpaceTimeCorrelation::new(env);
        tool.initialize(params).unwrap();
        let summary = tool.execute(&Progressor::new()).unwrap();

        let duplicates: Vec<&String> = summary
            .messages
            .warnings
            .iter()
            .filter(|w| w.contains("is not unique"))
            .collect();
        assert_eq!(duplicates.len(), 1);
        assert!(duplicates[0].contains("\"A\""));
    }

    #[test]
    fn temporal_mode_parses_from_text() {
        assert_eq!("Window".parse::<TemporalMode>().unwrap(), TemporalMode::Window);
        assert!("sometimes".parse::<TemporalMode>().is_err());
        assert_eq!(TemporalMode::default().to_string(), "bracketing");
    }
}
