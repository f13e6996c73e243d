pub mod projection;
pub mod stats;

pub use projection::{project_envelope, project_feature_class, project_point};
pub use stats::{BandStats, StatsHelper};
