pub mod correlation;
pub mod image_chips;
pub mod join;
pub mod tracks;

pub use correlation::{SpaceTimeCorrelation, SpaceTimeParams, SpaceTimeSummary, TemporalMode};
pub use image_chips::{AttributeImageDetections, AttributeImageParams, AttributeImageSummary};
pub use join::{join_one_to_one, JoinSpec};
pub use tracks::{group_tracks, Track, TrackPoint};
