//! Tool and parameter descriptors standing in for a host application's
//! geoprocessing parameter UI.

pub mod parameters;
pub mod tools;

pub use parameters::{Direction, ParameterDef, ParameterType, ParameterValues};
pub use tools::{
    attribute_image_detections_descriptor, space_time_correlation_descriptor, toolbox_descriptor,
    ToolDescriptor, ToolboxDescriptor, ATTRIBUTE_IMAGE_DETECTIONS, SPACE_TIME_CORRELATION,
};
