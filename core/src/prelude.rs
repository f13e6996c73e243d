use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::telemetry::Progressor;

/// Environment shared by every tool run: where intermediate data goes and
/// whether existing outputs may be replaced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolEnvironment {
    pub scratch_folder: PathBuf,
    pub overwrite_output: bool,
}

impl Default for ToolEnvironment {
    fn default() -> Self {
        Self {
            scratch_folder: std::env::temp_dir().join("detectcore-scratch"),
            overwrite_output: false,
        }
    }
}

impl ToolEnvironment {
    /// Creates the scratch folder if needed and returns it.
    pub fn ensure_scratch(&self) -> ToolResult<&PathBuf> {
        std::fs::create_dir_all(&self.scratch_folder)?;
        Ok(&self.scratch_folder)
    }
}

/// Messages collected while a tool runs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolMessages {
    pub notes: Vec<String>,
    pub warnings: Vec<String>,
}

impl ToolMessages {
    pub fn note(&mut self, message: impl Into<String>) {
        self.notes.push(message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}", message);
        self.warnings.push(message);
    }
}

/// Common error type for tool execution.
#[derive(thiserror::Error, Debug)]
pub enum ToolError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("field not found: {0}")]
    FieldNotFound(String),
    #[error("unsupported geometry: {0}")]
    UnsupportedGeometry(String),
    #[error("spatial reference: {0}")]
    SpatialReference(String),
    #[error("raster: {0}")]
    Raster(String),
    #[error("encoding: {0}")]
    Encoding(String),
    #[error("no candidate tracks matched any detection")]
    NoCandidates,
    #[error("output already exists: {0}")]
    OutputExists(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("internal failure: {0}")]
    Internal(String),
}

pub type ToolResult<T> = Result<T, ToolError>;

/// Lifecycle shared by the geoprocessing tools.
pub trait GeoprocessingTool {
    type Params;
    type Output;

    fn name(&self) -> &'static str;
    fn initialize(&mut self, params: Self::Params) -> ToolResult<()>;
    fn execute(&mut self, progress: &Progressor) -> ToolResult<Self::Output>;
    fn cleanup(&mut self);
}

/// Refuses to clobber an existing output unless the environment allows it.
pub(crate) fn check_output(path: &std::path::Path, env: &ToolEnvironment) -> ToolResult<()> {
    if path.exists() && !env.overwrite_output {
        return Err(ToolError::OutputExists(path.to_path_buf()));
    }
    Ok(())
}
