use anyhow::Context;
use detectcore::features::{
    write_feature_class, Envelope, Feature, FeatureClass, Geometry, Point, Polygon,
    SpatialReference,
};
use detectcore::math::project_point;
use detectcore::raster::{write_geotiff_u8, GeoTransform, Raster, SampleKind};
use ndarray::Array3;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

pub const DETECTION_TIME_FIELD: &str = "detected_at";
pub const TRACK_ID_FIELD: &str = "track_id";
pub const TRACK_TIME_FIELD: &str = "timestamp";

/// 2021-06-01T12:00:00Z in epoch milliseconds.
const BASE_TIME_MS: i64 = 1_622_548_800_000;
const DETECTION_SPACING_MS: i64 = 600_000;
const TRACK_STEP_MS: i64 = 30_000;
const UNMATCHED_SHIFT_MS: i64 = 86_400_000;

/// Configuration for a synthetic detection scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub seed: u64,
    pub detections: usize,
    /// Tracks beyond the number of detections never match in time.
    pub tracks: usize,
    pub points_per_track: usize,
    pub origin_lon: f64,
    pub origin_lat: f64,
    pub image_size_px: usize,
    pub pixel_size_m: f64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            detections: 5,
            tracks: 7,
            points_per_track: 6,
            origin_lon: -77.0365,
            origin_lat: 38.8977,
            image_size_px: 256,
            pixel_size_m: 2.0,
        }
    }
}

impl ScenarioConfig {
    fn normalized_points(&self) -> usize {
        self.points_per_track.max(2)
    }
}

#[derive(Debug, Clone)]
pub struct ScenarioFiles {
    pub detections: PathBuf,
    pub tracks: PathBuf,
    pub image: PathBuf,
}

/// Writes `detections.geojson`, `tracks.geojson` and `scene.tif` into
/// `out_dir`. All three are in Web Mercator.
pub fn build_scenario(config: &ScenarioConfig, out_dir: &Path) -> anyhow::Result<ScenarioFiles> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating scenario folder {}", out_dir.display()))?;
    let mut rng = StdRng::seed_from_u64(config.seed);

    let center = project_point(
        &Point::new(config.origin_lon, config.origin_lat),
        SpatialReference::WGS84,
        SpatialReference::WEB_MERCATOR,
    )
    .context("projecting scenario origin")?;
    let half = config.image_size_px.max(1) as f64 * config.pixel_size_m / 2.0;
    let extent = Envelope::new(
        center.x - half,
        center.y - half,
        center.x + half,
        center.y + half,
    );

    let boxes = detection_boxes(config, &extent, &mut rng);
    let detections = detection_layer(&boxes);
    let tracks = track_layer(config, &boxes, &extent, &mut rng);
    let raster = scene_raster(config, &extent, &boxes, &mut rng);

    let files = ScenarioFiles {
        detections: out_dir.join("detections.geojson"),
        tracks: out_dir.join("tracks.geojson"),
        image: out_dir.join("scene.tif"),
    };
    write_feature_class(&detections, &files.detections).context("writing detections")?;
    write_feature_class(&tracks, &files.tracks).context("writing tracks")?;
    write_geotiff_u8(&raster, &files.image).context("writing scene image")?;
    log::info!(
        "scenario written to {}: {} detections, {} tracks",
        out_dir.display(),
        detections.len(),
        tracks.len()
    );
    Ok(files)
}

fn detection_boxes(config: &ScenarioConfig, extent: &Envelope, rng: &mut StdRng) -> Vec<Envelope> {
    let margin = extent.width() * 0.1;
    (0..config.detections)
        .map(|_| {
            let cx = rng.gen_range(extent.min_x + margin..extent.max_x - margin);
            let cy = rng.gen_range(extent.min_y + margin..extent.max_y - margin);
            let w = rng.gen_range(4.0..12.0) * config.pixel_size_m;
            let h = rng.gen_range(4.0..12.0) * config.pixel_size_m;
            Envelope::new(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0)
        })
        .collect()
}

fn detection_time(index: usize) -> i64 {
    BASE_TIME_MS + index as i64 * DETECTION_SPACING_MS
}

fn detection_layer(boxes: &[Envelope]) -> FeatureClass {
    let mut fc = FeatureClass::new("detections", SpatialReference::WEB_MERCATOR);
    for (index, env) in boxes.iter().enumerate() {
        let mut attributes = Map::new();
        attributes.insert(DETECTION_TIME_FIELD.into(), json!(detection_time(index)));
        attributes.insert("label".into(), json!(format!("object {}", index + 1)));
        fc.features.push(Feature::new(
            index as i64 + 1,
            Geometry::Polygon(Polygon::from_envelope(env)),
            attributes,
        ));
    }
    fc
}

/// Tracks cross their detection's centre between two consecutive points
/// whose times straddle the detection time. Tracks without a detection
/// reuse the geometry of an existing one a day later.
fn track_layer(
    config: &ScenarioConfig,
    boxes: &[Envelope],
    extent: &Envelope,
    rng: &mut StdRng,
) -> FeatureClass {
    let mut fc = FeatureClass::new("tracks", SpatialReference::WEB_MERCATOR);
    let points = config.normalized_points();
    let middle = points as f64 / 2.0;
    let step = config.pixel_size_m * 10.0;
    let mut oid = 0;

    for track in 0..config.tracks {
        let (center, base_time) = match boxes.len() {
            0 => (
                Point::new(
                    (extent.min_x + extent.max_x) / 2.0,
                    (extent.min_y + extent.max_y) / 2.0,
                ),
                BASE_TIME_MS + UNMATCHED_SHIFT_MS,
            ),
            n if track < n => (envelope_center(&boxes[track]), detection_time(track)),
            n => (
                envelope_center(&boxes[track % n]),
                detection_time(track % n) + UNMATCHED_SHIFT_MS,
            ),
        };
        let heading: f64 = rng.gen_range(0.0..std::f64::consts::TAU);
        let (dx, dy) = (heading.cos() * step, heading.sin() * step);

        for k in 0..points {
            let offset = k as f64 - middle + 0.5;
            oid += 1;
            let mut attributes = Map::new();
            attributes.insert(TRACK_ID_FIELD.into(), Value::from(format!("T{:03}", track + 1)));
            attributes.insert(
                TRACK_TIME_FIELD.into(),
                json!(base_time + (offset * TRACK_STEP_MS as f64) as i64),
            );
            fc.features.push(Feature::new(
                oid,
                Geometry::Point(Point::new(center.x + offset * dx, center.y + offset * dy)),
                attributes,
            ));
        }
    }
    fc
}

fn envelope_center(env: &Envelope) -> Point {
    Point::new((env.min_x + env.max_x) / 2.0, (env.min_y + env.max_y) / 2.0)
}

fn scene_raster(
    config: &ScenarioConfig,
    extent: &Envelope,
    boxes: &[Envelope],
    rng: &mut StdRng,
) -> Raster {
    let size = config.image_size_px.max(1);
    let transform = GeoTransform::new(
        extent.min_x,
        extent.max_y,
        config.pixel_size_m,
        -config.pixel_size_m,
    );
    let mut data = Array3::<f32>::zeros((3, size, size));
    for row in 0..size {
        for col in 0..size {
            let (x, y) = transform.pixel_to_world(col as f64 + 0.5, row as f64 + 0.5);
            let inside = boxes
                .iter()
                .any(|b| x >= b.min_x && x <= b.max_x && y >= b.min_y && y <= b.max_y);
            let base: f32 = if inside {
                rng.gen_range(200.0..255.0)
            } else {
                rng.gen_range(30.0..80.0)
            };
            data[[0, row, col]] = base;
            data[[1, row, col]] = base * 0.9;
            data[[2, row, col]] = if inside { base * 0.5 } else { base * 1.2 };
        }
    }
    let mut raster = Raster::new(data, transform, SampleKind::U8);
    raster.spatial_reference = Some(SpatialReference::WEB_MERCATOR);
    raster
}
