use ndarray::Array3;

use crate::features::{Envelope, SpatialReference};
use crate::math::stats::{BandStats, StatsHelper};

/// Affine placement of a north-up (or south-up) raster without rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    /// Negative for north-up rasters.
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    /// World coordinates of the upper-left corner of pixel (`col`, `row`).
    pub fn pixel_to_world(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width,
            self.origin_y + row * self.pixel_height,
        )
    }

    /// Fractional (col, row) of a world coordinate.
    pub fn world_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.origin_x) / self.pixel_width,
            (y - self.origin_y) / self.pixel_height,
        )
    }
}

/// Sample width of the source data, which decides whether chips need a
/// stretch to fit into 8 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    U8,
    Wide,
}

/// Half-open pixel range `[row0, row1) x [col0, col1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWindow {
    pub row0: usize,
    pub row1: usize,
    pub col0: usize,
    pub col1: usize,
}

impl PixelWindow {
    pub fn width(&self) -> usize {
        self.col1 - self.col0
    }

    pub fn height(&self) -> usize {
        self.row1 - self.row0
    }
}

/// Band-sequential raster grid, `data[[band, row, col]]`.
#[derive(Debug, Clone)]
pub struct Raster {
    pub data: Array3<f32>,
    pub transform: GeoTransform,
    pub nodata: Option<f32>,
    pub spatial_reference: Option<SpatialReference>,
    pub sample_kind: SampleKind,
}

impl Raster {
    pub fn new(data: Array3<f32>, transform: GeoTransform, sample_kind: SampleKind) -> Self {
        Self {
            data,
            transform,
            nodata: None,
            spatial_reference: None,
            sample_kind,
        }
    }

    pub fn bands(&self) -> usize {
        self.data.shape()[0]
    }

    pub fn rows(&self) -> usize {
        self.data.shape()[1]
    }

    pub fn cols(&self) -> usize {
        self.data.shape()[2]
    }

    pub fn extent(&self) -> Envelope {
        let (x0, y0) = self.transform.pixel_to_world(0.0, 0.0);
        let (x1, y1) = self
            .transform
            .pixel_to_world(self.cols() as f64, self.rows() as f64);
        Envelope::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }

    pub fn is_valid(&self, value: f32) -> bool {
        !value.is_nan() && Some(value) != self.nodata
    }

    /// Pixels touched by `env`, clamped to the raster. A zero-width or
    /// zero-height envelope still covers the pixel it falls in. `None` when
    /// the envelope lies outside the raster.
    pub fn pixel_window(&self, env: &Envelope) -> Option<PixelWindow> {
        let (ca, ra) = self.transform.world_to_pixel(env.min_x, env.max_y);
        let (cb, rb) = self.transform.world_to_pixel(env.max_x, env.min_y);
        if ![ca, ra, cb, rb].iter().all(|v| v.is_finite()) {
            return None;
        }

        let (col0, col1) = cover(ca.min(cb), ca.max(cb));
        let (row0, row1) = cover(ra.min(rb), ra.max(rb));

        let col0 = col0.max(0);
        let row0 = row0.max(0);
        let col1 = col1.min(self.cols() as i64);
        let row1 = row1.min(self.rows() as i64);
        if col0 >= col1 || row0 >= row1 {
            return None;
        }
        Some(PixelWindow {
            row0: row0 as usize,
            row1: row1 as usize,
            col0: col0 as usize,
            col1: col1 as usize,
        })
    }

    pub fn band_stats(&self, band: usize) -> Option<BandStats> {
        if band >= self.bands() {
            return None;
        }
        StatsHelper::band_stats(self.data.index_axis(ndarray::Axis(0), band).iter(), self.nodata)
    }
}

/// Fractional pixel offsets this close to a pixel edge count as on it, so
/// reprojection noise does not add a row or column.
const EDGE_SNAP: f64 = 1e-6;

fn cover(lo: f64, hi: f64) -> (i64, i64) {
    let start = (lo + EDGE_SNAP).floor() as i64;
    let end = (hi - EDGE_SNAP).ceil() as i64;
    if end <= start {
        (start, start + 1)
    } else {
        (start, end)
    }
}
