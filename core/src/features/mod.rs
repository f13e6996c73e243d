pub mod attachment;
pub mod feature;
pub mod geojson;
pub mod geometry;
pub mod spatial_ref;
pub mod time;

pub use attachment::{AttachmentRecord, AttachmentTable};
pub use feature::{Feature, FeatureClass, OID_FIELD};
pub use geojson::{read_feature_class, write_feature_class};
pub use geometry::{Envelope, Geometry, GeometryKind, Point, Polygon};
pub use spatial_ref::SpatialReference;
