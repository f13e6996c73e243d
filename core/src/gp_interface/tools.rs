use serde::Serialize;
use serde_json::json;

use crate::features::{GeometryKind, OID_FIELD};
use crate::gp_interface::parameters::{Direction, ParameterDef, ParameterType, ParameterValues};
use crate::prelude::{ToolError, ToolResult};
use crate::processing::correlation::DEFAULT_DISTANCE_TOLERANCE;
use crate::processing::{AttributeImageParams, SpaceTimeParams, TemporalMode};

pub const ATTRIBUTE_IMAGE_DETECTIONS: &str = "AttributeImageDetections";
pub const SPACE_TIME_CORRELATION: &str = "SpaceTimeCorrelation";

#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub parameters: Vec<ParameterDef>,
}

impl ToolDescriptor {
    /// Applies defaults and checks `values` against the parameter list.
    pub fn validate(&self, mut values: ParameterValues) -> ToolResult<ParameterValues> {
        values.validate_against(&self.parameters)?;
        Ok(values)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolboxDescriptor {
    pub alias: &'static str,
    pub label: &'static str,
    pub tools: Vec<ToolDescriptor>,
}

impl ToolboxDescriptor {
    pub fn tool(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools
            .iter()
            .find(|tool| tool.name.eq_ignore_ascii_case(name))
    }
}

pub fn toolbox_descriptor() -> ToolboxDescriptor {
    ToolboxDescriptor {
        alias: "Object Detection Tools",
        label: "Object Detection Tools",
        tools: vec![
            attribute_image_detections_descriptor(),
            space_time_correlation_descriptor(),
        ],
    }
}

pub fn attribute_image_detections_descriptor() -> ToolDescriptor {
    use Direction::{Input, Output};
    use ParameterType as P;

    ToolDescriptor {
        name: ATTRIBUTE_IMAGE_DETECTIONS,
        label: "Add Image Chip to Detection",
        description: "Creates an image chip of every detection from the source image and \
                      stores it on the detection feature class, as an attachment or as a \
                      BLOB field.",
        parameters: vec![
            ParameterDef::new("detectionFC", "Detection Features", P::FeatureLayer, Input, true)
                .with_filter(GeometryKind::Polygon),
            ParameterDef::new("sourceImage", "Source Image", P::RasterLayer, Input, true),
            ParameterDef::new("storeAsBlob", "Store as BLOB", P::Boolean, Input, false)
                .with_default(json!(false)),
            ParameterDef::new("outputFeatures", "Output Features", P::FeatureClass, Output, false),
        ],
    }
}

pub fn space_time_correlation_descriptor() -> ToolDescriptor {
    use Direction::{Input, Output};
    use ParameterType as P;

    ToolDescriptor {
        name: SPACE_TIME_CORRELATION,
        label: "Space Time Correlation",
        description: "Correlates tracks with detections in space and time and joins the \
                      matching track information onto the detections.",
        parameters: vec![
            ParameterDef::new("detectionFC", "Detection Features", P::FeatureLayer, Input, true)
                .with_filter(GeometryKind::Polygon),
            ParameterDef::new("detectionIDField", "Detection ID Field", P::Field, Input, false)
                .depends_on("detectionFC")
                .with_default(json!(OID_FIELD)),
            ParameterDef::new("detectionTimeField", "Detection Time Field", P::Field, Input, true)
                .depends_on("detectionFC"),
            ParameterDef::new("tracksFC", "Track Features", P::FeatureLayer, Input, true)
                .with_filter(GeometryKind::Point),
            ParameterDef::new("trackIDField", "Track ID Field", P::Field, Input, true)
                .depends_on("tracksFC"),
            ParameterDef::new("trackTimeField", "Track Time Field", P::Field, Input, true)
                .depends_on("tracksFC"),
            ParameterDef::new("outputFeatures", "Output Features", P::FeatureClass, Output, true),
            ParameterDef::new("distanceTolerance", "Distance Tolerance (m)", P::Long, Input, true)
                .with_default(json!(DEFAULT_DISTANCE_TOLERANCE as i64)),
            ParameterDef::new("temporalMode", "Temporal Criterion", P::String, Input, false)
                .with_choices(&["bracketing", "proximity", "window"])
                .with_default(json!(TemporalMode::default().to_string())),
            ParameterDef::new("timeWindowSecs", "Time Window (s)", P::Double, Input, false),
        ],
    }
}

impl TryFrom<&ParameterValues> for AttributeImageParams {
    type Error = ToolError;

    fn try_from(values: &ParameterValues) -> ToolResult<Self> {
        Ok(Self {
            detections: values.path("detectionFC")?,
            image: values.path("sourceImage")?,
            store_as_blob: values.bool_or("storeAsBlob", false),
            output: values.path("outputFeatures").ok(),
        })
    }
}

impl TryFrom<&ParameterValues> for SpaceTimeParams {
    type Error = ToolError;

    fn try_from(values: &ParameterValues) -> ToolResult<Self> {
        Ok(Self {
            detections: values.path("detectionFC")?,
            detection_id_field: values
                .str("detectionIDField")
                .unwrap_or(OID_FIELD)
                .to_string(),
            detection_time_field: values.str("detectionTimeField")?.to_string(),
            tracks: values.path("tracksFC")?,
            track_id_field: values.str("trackIDField")?.to_string(),
            track_time_field: values.str("trackTimeField")?.to_string(),
            output: values.path("outputFeatures")?,
            distance_tolerance: values
                .f64("distanceTolerance")
                .unwrap_or(DEFAULT_DISTANCE_TOLERANCE),
            temporal: match values.get("temporalMode") {
                Some(_) => values.str("temporalMode")?.parse()?,
                None => TemporalMode::default(),
            },
            time_window_secs: values.f64("timeWindowSecs"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const DETECTIONS: &str = r#"{"type": "FeatureCollection", "features": [
        {"type": "Feature", "id": 1, "properties": {"seen": "2021-06-01T12:00:00Z"},
         "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]]}}
    ]}"#;
    const TRACKS: &str = r#"{"type": "FeatureCollection", "features": [
        {"type": "Feature", "properties": {"tid": 5, "ts": "2021-06-01T12:00:00Z"},
         "geometry": {"type": "Point", "coordinates": [0.5, 0.5]}}
    ]}"#;

    #[test]
    fn toolbox_lists_both_tools() {
        let toolbox = toolbox_descriptor();
        assert_eq!(toolbox.alias, "Object Detection Tools");
        assert!(toolbox.tool("spacetimecorrelation").is_some());
        assert!(toolbox.tool(ATTRIBUTE_IMAGE_DETECTIONS).is_some());
        let text = serde_json::to_string(&toolbox).unwrap();
        assert!(text.contains("distanceTolerance"));
    }

    #[test]
    fn correlation_values_validate_and_convert() {
        let dir = tempdir().unwrap();
        let detections = dir.path().join("d.geojson");
        let tracks = dir.path().join("t.geojson");
        fs::write(&detections, DETECTIONS).unwrap();
        fs::write(&tracks, TRACKS).unwrap();

        let mut values = ParameterValues::new();
        values
            .set("detectionFC", detections.to_string_lossy().into_owned())
            .set("detectionTimeField", "seen")
            .set("tracksFC", tracks.to_string_lossy().into_owned())
            .set("trackIDField", "tid")
            .set("trackTimeField", "ts")
            .set("outputFeatures", "out.geojson");
        let values = space_time_correlation_descriptor().validate(values).unwrap();
        let params = SpaceTimeParams::try_from(&values).unwrap();

        assert_eq!(params.detection_id_field, OID_FIELD);
        assert_eq!(params.distance_tolerance, 800.0);
        assert_eq!(params.temporal, TemporalMode::Bracketing);
    }

    #[test]
    fn field_parameters_are_checked_against_their_layer() {
        let dir = tempdir().unwrap();
        let detections = dir.path().join("d.geojson");
        let tracks = dir.path().join("t.geojson");
        fs::write(&detections, DETECTIONS).unwrap();
        fs::write(&tracks, TRACKS).unwrap();

        let mut values = ParameterValues::new();
        values
            .set("detectionFC", detections.to_string_lossy().into_owned())
            .set("detectionTimeField", "seen")
            .set("tracksFC", tracks.to_string_lossy().into_owned())
            .set("trackIDField", "vessel")
            .set("trackTimeField", "ts")
            .set("outputFeatures", "out.geojson");
        assert!(matches!(
            space_time_correlation_descriptor().validate(values),
            Err(ToolError::FieldNotFound(_))
        ));
    }

    #[test]
    fn polygon_filter_rejects_point_layer() {
        let dir = tempdir().unwrap();
        let tracks = dir.path().join("t.geojson");
        fs::write(&tracks, TRACKS).unwrap();
        let mut values = ParameterValues::new();
        values
            .set("detectionFC", tracks.to_string_lossy().into_owned())
            .set("sourceImage", tracks.to_string_lossy().into_owned());
        assert!(matches!(
            attribute_image_detections_descriptor().validate(values),
            Err(ToolError::UnsupportedGeometry(_))
        ));
    }
}
