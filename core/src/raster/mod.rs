pub mod chip;
pub mod geotiff;
pub mod grid;

pub use chip::{ChipExtractor, ImageChip};
pub use geotiff::{read_geotiff, write_geotiff_u8};
pub use grid::{GeoTransform, PixelWindow, Raster, SampleKind};
