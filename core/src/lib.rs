//! Geoprocessing core for object-detection outputs.
//!
//! Two tools live here: one clips an image chip from a source raster for each
//! polygon detection and stores it on the feature, the other correlates point
//! tracks with detections in space and time and joins the matches back onto
//! the detections. Feature classes are GeoJSON, rasters are GeoTIFF.

pub mod features;
pub mod gp_interface;
pub mod math;
pub mod prelude;
pub mod processing;
pub mod raster;
pub mod telemetry;

pub use prelude::{GeoprocessingTool, ToolEnvironment, ToolError, ToolResult};
