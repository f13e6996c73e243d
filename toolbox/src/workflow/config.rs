use anyhow::Context;
use detectcore::processing::{AttributeImageParams, SpaceTimeParams};
use detectcore::ToolEnvironment;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// One tool invocation inside a workflow file.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolRun {
    AttributeImageDetections(AttributeImageParams),
    SpaceTimeCorrelation(SpaceTimeParams),
}

impl ToolRun {
    pub fn tool_name(&self) -> &'static str {
        match self {
            ToolRun::AttributeImageDetections(_) => "AttributeImageDetections",
            ToolRun::SpaceTimeCorrelation(_) => "SpaceTimeCorrelation",
        }
    }

    /// Resolves relative paths against `base`, the workflow file's folder.
    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        match self {
            ToolRun::AttributeImageDetections(params) => {
                resolve(&mut params.detections);
                resolve(&mut params.image);
                if let Some(output) = params.output.as_mut() {
                    resolve(output);
                }
            }
            ToolRun::SpaceTimeCorrelation(params) => {
                resolve(&mut params.detections);
                resolve(&mut params.tracks);
                resolve(&mut params.output);
            }
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkflowConfig {
    #[serde(default)]
    pub environment: ToolEnvironment,
    #[serde(default)]
    pub report: Option<PathBuf>,
    pub tools: Vec<ToolRun>,
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let mut config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;

        let base = path_ref.parent().unwrap_or_else(|| Path::new("."));
        for run in &mut config.tools {
            run.resolve_paths(base);
        }
        if let Some(report) = config.report.as_mut() {
            if report.is_relative() {
                *report = base.join(&*report);
            }
        }
        Ok(config)
    }

    /// Workflow of a single tool run, as built from command-line arguments.
    pub fn single(environment: ToolEnvironment, run: ToolRun, report: Option<PathBuf>) -> Self {
        Self {
            environment,
            report,
            tools: vec![run],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use detectcore::processing::TemporalMode;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const WORKFLOW_YAML: &str = r#"
environment:
  scratch_folder: /tmp/scratch
  overwrite_output: true
tools:
  - tool: attribute_image_detections
    detections: d.geojson
    image: /data/scene.tif
  - tool: space_time_correlation
    detections: d.geojson
    detection_time_field: seen
    tracks: t.geojson
    track_id_field: mmsi
    track_time_field: ts
    output: out.geojson
"#;

    #[test]
    fn config_load_reads_yaml_and_applies_defaults() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(WORKFLOW_YAML.as_bytes()).unwrap();
        let path = temp.into_temp_path();
        let cfg = WorkflowConfig::load(&path).unwrap();
        let base = path.parent().unwrap();

        assert!(cfg.environment.overwrite_output);
        assert_eq!(cfg.tools.len(), 2);
        match &cfg.tools[0] {
            ToolRun::AttributeImageDetections(params) => {
                assert!(!params.store_as_blob);
                assert_eq!(params.detections, base.join("d.geojson"));
                assert_eq!(params.image, PathBuf::from("/data/scene.tif"));
            }
            other => panic!("unexpected run {:?}", other),
        }
        match &cfg.tools[1] {
            ToolRun::SpaceTimeCorrelation(params) => {
                assert_eq!(params.distance_tolerance, 800.0);
                assert_eq!(params.detection_id_field, "OBJECTID");
                assert_eq!(params.temporal, TemporalMode::Bracketing);
            }
            other => panic!("unexpected run {:?}", other),
        }
    }

    #[test]
    fn unknown_tool_is_rejected() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"tools:\n  - tool: buffer\n    distance: 3\n").unwrap();
        assert!(WorkflowConfig::load(temp.path()).is_err());
    }
}
