use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

use crate::features::{
    read_feature_class, write_feature_class, AttachmentTable, Feature, GeometryKind,
};
use crate::math::projection::project_envelope;
use crate::prelude::{
    check_output, GeoprocessingTool, ToolEnvironment, ToolError, ToolMessages, ToolResult,
};
use crate::raster::{read_geotiff, ChipExtractor, Raster};
use crate::telemetry::{MetricsRecorder, Progressor};

/// Field that receives the encoded chip in blob mode.
pub const IMAGE_FIELD: &str = "image";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeImageParams {
    pub detections: PathBuf,
    pub image: PathBuf,
    #[serde(default)]
    pub store_as_blob: bool,
    /// Defaults to updating the detections in place.
    #[serde(default)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttributeImageSummary {
    pub output: PathBuf,
    pub attachment_table: Option<PathBuf>,
    pub processed: usize,
    pub skipped: usize,
    pub messages: ToolMessages,
}

/// Clips an image chip from the source raster for every detection polygon
/// and stores it as a blob field or as an attachment.
pub struct AttributeImageDetections {
    env: ToolEnvironment,
    params: Option<AttributeImageParams>,
    metrics: MetricsRecorder,
    scratch_files: Vec<PathBuf>,
}

impl AttributeImageDetections {
    pub fn new(env: ToolEnvironment) -> Self {
        Self {
            env,
            params: None,
            metrics: MetricsRecorder::new(),
            scratch_files: Vec::new(),
        }
    }

    fn chip_png(
        &self,
        extractor: &ChipExtractor<'_>,
        raster: &Raster,
        feature: &Feature,
        detections_sr: crate::features::SpatialReference,
    ) -> ToolResult<Option<Vec<u8>>> {
        let Some(mut envelope) = feature.geometry.envelope() else {
            return Ok(None);
        };
        if let Some(raster_sr) = raster.spatial_reference {
            envelope = project_envelope(&envelope, detections_sr, raster_sr)?;
        }
        extractor
            .extract(&envelope)
            .map(|chip| chip.to_png())
            .transpose()
    }
}

impl GeoprocessingTool for AttributeImageDetections {
    type Params = AttributeImageParams;
    type Output = AttributeImageSummary;

    fn name(&self) -> &'static str {
        "AttributeImageDetections"
    }

    fn initialize(&mut self, params: AttributeImageParams) -> ToolResult<()> {
        if !params.detections.exists() {
            return Err(ToolError::InvalidParameter(format!(
                "detections '{}' does not exist",
                params.detections.display()
            )));
        }
        if !params.image.exists() {
            return Err(ToolError::InvalidParameter(format!(
                "source image '{}' does not exist",
                params.image.display()
            )));
        }
        self.params = Some(params);
        Ok(())
    }

    fn execute(&mut self, progress: &Progressor) -> ToolResult<AttributeImageSummary> {
        let params = self
            .params
            .clone()
            .ok_or_else(|| ToolError::Internal("tool not initialized".into()))?;
        let output = params
            .output
            .clone()
            .unwrap_or_else(|| params.detections.clone());
        if output != params.detections {
            check_output(&output, &self.env)?;
        }

        let mut detections = read_feature_class(&params.detections)?;
        detections.require_kind(GeometryKind::Polygon)?;
        let raster = read_geotiff(&params.image)?;
        let extractor = ChipExtractor::new(&raster);
        let detections_sr = detections.spatial_reference;

        let mut messages = ToolMessages::default();
        if raster.spatial_reference.is_none() {
            messages.warn(format!(
                "'{}' has no spatial reference; assuming it matches the detections",
                params.image.display()
            ));
        }

        let mut chips: Vec<(i64, Option<Vec<u8>>)> = Vec::with_capacity(detections.len());
        let total = detections.len();
        for (index, feature) in detections.features.iter().enumerate() {
            progress.set_position(index * 100 / total.max(1));
            progress.set_label(&format!("Processing {}...", feature.oid));
            let png = self.chip_png(&extractor, &raster, feature, detections_sr)?;
            match &png {
                Some(_) => self.metrics.record_processed(),
                None => {
                    self.metrics.record_skipped();
                    messages.warn(format!(
                        "detection {} is outside the image extent; skipped",
                        feature.oid
                    ));
                }
            }
            chips.push((feature.oid, png));
        }

        let attachment_table = if params.store_as_blob {
            detections.add_field(IMAGE_FIELD, Value::Null);
            for (feature, (_, png)) in detections.features.iter_mut().zip(&chips) {
                let value = png
                    .as_ref()
                    .map(|bytes| Value::String(STANDARD.encode(bytes)))
                    .unwrap_or(Value::Null);
                feature.set_field(IMAGE_FIELD, value);
            }
            write_feature_class(&detections, &output)?;
            None
        } else {
            let scratch = self.env.ensure_scratch()?.clone();
            let mut staged = Vec::new();
            for (oid, png) in &chips {
                if let Some(bytes) = png {
                    let path = scratch.join(format!("chip{}.png", oid));
                    fs::write(&path, bytes)?;
                    self.scratch_files.push(path.clone());
                    staged.push((*oid, path));
                }
            }

            if output != params.detections {
                write_feature_class(&detections, &output)?;
            }
            let mut table = AttachmentTable::enable(&output)?;
            for (oid, path) in &staged {
                table.add(*oid, path)?;
            }
            table.save()?;
            Some(table.table_path().to_path_buf())
        };

        progress.set_position(100);
        let snapshot = self.metrics.snapshot();
        messages.note(format!(
            "{} chips stored, {} detections skipped",
            snapshot.processed, snapshot.skipped
        ));
        progress.record(&format!(
            "{} finished: {} processed, {} skipped",
            self.name(),
            snapshot.processed,
            snapshot.skipped
        ));

        Ok(AttributeImageSummary {
            output,
            attachment_table,
            processed: snapshot.processed,
            skipped: snapshot.skipped,
            messages,
        })
    }

    fn cleanup(&mut self) {
        for path in self.scratch_files.drain(..) {
            let _ = fs::remove_file(path);
        }
        self.params = None;
    }
}
