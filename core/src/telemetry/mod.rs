pub mod log;
pub mod metrics;

pub use log::Progressor;
pub use metrics::{MetricsRecorder, MetricsSnapshot};
