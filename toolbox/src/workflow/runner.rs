use crate::workflow::config::{ToolRun, WorkflowConfig};
use anyhow::Context;
use detectcore::processing::{
    AttributeImageDetections, AttributeImageSummary, SpaceTimeCorrelation, SpaceTimeSummary,
};
use detectcore::telemetry::Progressor;
use detectcore::GeoprocessingTool;

pub enum RunOutcome {
    Images(AttributeImageSummary),
    Correlation(SpaceTimeSummary),
}

pub struct WorkflowResult {
    pub tool: &'static str,
    pub outcome: RunOutcome,
}

impl WorkflowResult {
    pub fn warnings(&self) -> &[String] {
        match &self.outcome {
            RunOutcome::Images(summary) => &summary.messages.warnings,
            RunOutcome::Correlation(summary) => &summary.messages.warnings,
        }
    }

    pub fn summary_line(&self) -> String {
        match &self.outcome {
            RunOutcome::Images(summary) => format!(
                "tool={} output={} chips={} skipped={} attachments={} warnings={}",
                self.tool,
                summary.output.display(),
                summary.processed,
                summary.skipped,
                summary
                    .attachment_table
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "-".into()),
                summary.messages.warnings.len()
            ),
            RunOutcome::Correlation(summary) => format!(
                "tool={} output={} detections={} tracks={} candidates={} matched={} warnings={}",
                self.tool,
                summary.output.display(),
                summary.detections,
                summary.tracks,
                summary.candidates,
                summary.matched_detections,
                summary.messages.warnings.len()
            ),
        }
    }
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self { config }
    }

    /// Runs every tool of the workflow in order, stopping at the first failure.
    pub fn execute(&self) -> anyhow::Result<Vec<WorkflowResult>> {
        let mut results = Vec::with_capacity(self.config.tools.len());
        for (index, run) in self.config.tools.iter().enumerate() {
            log::info!(
                "workflow step {}/{}: {}",
                index + 1,
                self.config.tools.len(),
                run.tool_name()
            );
            results.push(self.run_one(run)?);
        }
        Ok(results)
    }

    fn run_one(&self, run: &ToolRun) -> anyhow::Result<WorkflowResult> {
        let env = self.config.environment.clone();
        let progress = Progressor::new();
        let outcome = match run {
            ToolRun::AttributeImageDetections(params) => {
                let mut tool = AttributeImageDetections::new(env);
                tool.initialize(params.clone())
                    .context("initializing AttributeImageDetections")?;
                let result = tool.execute(&progress);
                tool.cleanup();
                RunOutcome::Images(result.context("executing AttributeImageDetections")?)
            }
            ToolRun::SpaceTimeCorrelation(params) => {
                let mut tool = SpaceTimeCorrelation::new(env);
                tool.initialize(params.clone())
                    .context("initializing SpaceTimeCorrelation")?;
                let result = tool.execute(&progress);
                tool.cleanup();
                RunOutcome::Correlation(result.context("executing SpaceTimeCorrelation")?)
            }
        };
        Ok(WorkflowResult {
            tool: run.tool_name(),
            outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use detectcore::processing::{AttributeImageParams, SpaceTimeParams, TemporalMode};
    use detectcore::ToolEnvironment;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn missing_input_fails_with_context() {
        let dir = tempdir().unwrap();
        let env = ToolEnvironment {
            scratch_folder: dir.path().join("scratch"),
            overwrite_output: false,
        };
        let run = ToolRun::AttributeImageDetections(AttributeImageParams {
            detections: dir.path().join("missing.geojson"),
            image: dir.path().join("missing.tif"),
            store_as_blob: true,
            output: None,
        });
        let runner = Runner::new(WorkflowConfig::single(env, run, None));
        let err = runner.execute().err().unwrap();
        assert!(format!("{:#}", err).contains("initializing AttributeImageDetections"));
    }

    #[test]
    fn correlation_without_candidates_reports_error_and_writes_nothing() {
        let dir = tempdir().unwrap();
        let detections = dir.path().join("d.geojson");
        let tracks = dir.path().join("t.geojson");
        fs::write(
            &detections,
            r#"{"type": "FeatureCollection", "features": [
                {"type": "Feature", "id": 1, "properties": {"seen": "2021-06-01T12:00:00Z"},
                 "geometry": {"type": "Polygon",
                              "coordinates": [[[0,0],[0.001,0],[0.001,0.001],[0,0.001],[0,0]]]}}
            ]}"#,
        )
        .unwrap();
        fs::write(
            &tracks,
            r#"{"type": "FeatureCollection", "features": [
                {"type": "Feature", "properties": {"tid": 1, "ts": "2021-06-01T11:00:00Z"},
                 "geometry": {"type": "Point", "coordinates": [5.0, 5.0]}},
                {"type": "Feature", "properties": {"tid": 1, "ts": "2021-06-01T13:00:00Z"},
                 "geometry": {"type": "Point", "coordinates": [5.1, 5.0]}}
            ]}"#,
        )
        .unwrap();
        let output = dir.path().join("out.geojson");
        let env = ToolEnvironment {
            scratch_folder: dir.path().join("scratch"),
            overwrite_output: false,
        };
        let run = ToolRun::SpaceTimeCorrelation(SpaceTimeParams {
            detections,
            detection_id_field: "OBJECTID".into(),
            detection_time_field: "seen".into(),
            tracks,
            track_id_field: "tid".into(),
            track_time_field: "ts".into(),
            output: output.clone(),
            distance_tolerance: 800.0,
            temporal: TemporalMode::Bracketing,
            time_window_secs: None,
        });

        let result = Runner::new(WorkflowConfig::single(env, run, None)).execute();
        assert!(result.is_err());
        assert!(!output.exists());
    }
}
